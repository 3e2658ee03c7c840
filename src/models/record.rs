use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tool::CalculatorTool;

/// 远程计算返回的结果记录
pub type ResultRecord = Value;

/// 表单输入记录
///
/// 字段名到标量值的映射，保留调用方的插入顺序（规范化时会重新排序）。
/// 调用方应传入完整的当前表单状态，而不仅是本次修改的字段。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputRecord {
    fields: LinkedHashMap<String, Value>,
}

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或覆盖字段
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// 链式插入
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// 解析 `name=value` 形式的字段（CLI 使用）
    ///
    /// 值原样作为字符串保存，类型推断交给规范化器。
    pub fn parse_assignment(&mut self, assignment: &str) -> Option<()> {
        let (name, value) = assignment.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        self.insert(name, value);
        Some(())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for InputRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl From<Map<String, Value>> for InputRecord {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

/// 本地化信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleBundle {
    /// 国家代码（如 "US"）
    pub country: String,
    /// 货币代码（如 "USD"）
    pub currency: String,
    /// 语言（如 "en"）
    pub language: String,
    /// 区域标签（如 "en-US"）
    pub locale: String,
}

impl Default for LocaleBundle {
    fn default() -> Self {
        Self {
            country: "US".to_string(),
            currency: "USD".to_string(),
            language: "en".to_string(),
            locale: "en-US".to_string(),
        }
    }
}

/// 缓存上下文
///
/// 命名空间 + 分类 + 本地化信息，会参与缓存键计算，
/// 因此相同表单在不同本地化下得到不同的缓存条目。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheContext {
    /// 计算族（工具 ID）
    pub namespace: String,
    /// 分类标签
    pub category: String,
    pub locale: LocaleBundle,
}

impl CacheContext {
    pub fn new(
        namespace: impl Into<String>,
        category: impl Into<String>,
        locale: LocaleBundle,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            category: category.into(),
            locale,
        }
    }

    /// 根据工具定义构造上下文
    pub fn for_tool(tool: &CalculatorTool, locale: LocaleBundle) -> Self {
        Self::new(tool.id.clone(), tool.category.clone(), locale)
    }
}
