//! 输入规范化
//!
//! 把表单输入 + 本地化上下文转换为可比较的规范记录：
//! - 键按字典序排列（`BTreeMap`）
//! - 字符串去首尾空白并转小写
//! - 数值字段去掉货币符号、千分位、空白后输出精确的十进制规范文本
//! - 布尔值输出为 `"true"` / `"false"`
//! - 空值字段直接丢弃（缺失与空等价）
//!
//! 规范化永不失败：意外类型会被强制转成文本后再套用上述规则。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use super::key::SCHEMA_VERSION;
use crate::models::{CacheContext, CalculatorTool, InputRecord};

/// 数值字段中需要剔除的字符：空白、千分位、百分号、货币符号
///
/// 逗号一律视为千分位，不按区域识别小数逗号：`12,5` 会被当作 `125`。
static NUMERIC_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s,_'%\p{Sc}]").expect("数值清洗正则无效"));

/// 十进制文本：可选符号、整数/小数部分、可选指数
static DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<sign>[+-]?)(?:(?P<int>\d+)(?:\.(?P<frac>\d*))?|\.(?P<lead_frac>\d+))(?:[eE](?P<exp>[+-]?\d+))?$",
    )
    .expect("十进制正则无效")
});

/// 规范文本中最多补齐的零，超出后改用科学计数法
const MAX_PADDING_ZEROS: usize = 32;

/// 上下文字段前缀，表单字段无法覆盖这些键
const CONTEXT_PREFIX: &str = "__";

/// 规范记录
///
/// 不可变；序列化结果即摘要输入，键顺序稳定、无多余空白。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CanonicalRecord {
    fields: BTreeMap<String, String>,
}

impl CanonicalRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields.iter()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// 紧凑 JSON 文本
    pub fn to_canonical_json(&self) -> String {
        // 字符串到字符串的映射序列化不会失败
        serde_json::to_string(&self.fields).unwrap_or_default()
    }
}

/// 规范化器
///
/// 数值字段列表是封闭的：不在列表中的字段即使看起来像数字，也按普通字符串处理。
#[derive(Debug, Clone)]
pub struct Normalizer {
    numeric_fields: HashSet<String>,
}

impl Normalizer {
    pub fn new<I, S>(numeric_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            numeric_fields: numeric_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn for_tool(tool: &CalculatorTool) -> Self {
        Self::new(tool.numeric_fields.iter().cloned())
    }

    pub fn is_numeric_field(&self, name: &str) -> bool {
        self.numeric_fields.contains(name)
    }

    /// 规范化输入记录
    ///
    /// 相同的输入和上下文总是得到逐字节相同的结果。
    pub fn normalize(&self, input: &InputRecord, context: &CacheContext) -> CanonicalRecord {
        let mut fields = BTreeMap::new();

        // 按原始字段名排序后处理，去空白后同名的字段无论传入顺序如何都由同一个胜出
        let mut entries: Vec<_> = input.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (name, value) in entries {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            let normalized = if self.is_numeric_field(name) {
                normalize_numeric(value)
            } else {
                normalize_scalar(value)
            };

            if let Some(normalized) = normalized {
                fields.insert(name.to_string(), normalized);
            }
        }

        let locale = &context.locale;
        let context_fields = [
            ("namespace", context.namespace.as_str()),
            ("category", context.category.as_str()),
            ("country", locale.country.as_str()),
            ("currency", locale.currency.as_str()),
            ("language", locale.language.as_str()),
            ("locale", locale.locale.as_str()),
        ];
        for (name, value) in context_fields {
            let key = format!("{CONTEXT_PREFIX}{name}");
            match normalize_text(value) {
                Some(value) => fields.insert(key, value),
                None => fields.remove(&key),
            };
        }

        fields.insert(
            format!("{CONTEXT_PREFIX}schema"),
            SCHEMA_VERSION.to_string(),
        );

        CanonicalRecord { fields }
    }
}

/// 普通字段规范化
fn normalize_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => normalize_text(s),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        // 意外类型：强制转成紧凑 JSON 文本
        other => normalize_text(&other.to_string()),
    }
}

/// 数值字段规范化
fn normalize_numeric(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Some(canonical_decimal(&text).unwrap_or(text))
        }
        Value::String(s) => {
            let stripped = NUMERIC_NOISE.replace_all(s, "");
            if stripped.is_empty() {
                return None;
            }
            // 无法解析时保留清洗后的文本
            Some(canonical_decimal(&stripped).unwrap_or_else(|| stripped.to_lowercase()))
        }
        other => normalize_scalar(other),
    }
}

fn normalize_text(text: &str) -> Option<String> {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// 十进制文本的精确规范形式
///
/// 直接在数字串上处理，不经过浮点数：去掉前导零和小数尾随零，
/// 展开指数，`-0` 输出为 `0`（`1000.00` → `1000`，`1.5e3` → `1500`）。
/// 不是合法十进制文本时返回 `None`。
fn canonical_decimal(text: &str) -> Option<String> {
    let caps = DECIMAL.captures(text)?;
    let negative = &caps["sign"] == "-";
    let int = caps.name("int").map_or("", |m| m.as_str());
    let frac = caps
        .name("frac")
        .or_else(|| caps.name("lead_frac"))
        .map_or("", |m| m.as_str());
    let exp: i64 = match caps.name("exp") {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    // 小数点位于 digits 的第 point 位之前
    let digits = format!("{int}{frac}");
    let mut point = (int.len() as i64).checked_add(exp)?;

    let significant = digits.trim_start_matches('0');
    point -= (digits.len() - significant.len()) as i64;
    let significant = significant.trim_end_matches('0');
    if significant.is_empty() {
        return Some("0".to_string());
    }

    let len = significant.len() as i64;
    let body = if point <= 0 && (-point) as usize <= MAX_PADDING_ZEROS {
        format!("0.{}{significant}", "0".repeat((-point) as usize))
    } else if point >= len && (point - len) as usize <= MAX_PADDING_ZEROS {
        format!("{significant}{}", "0".repeat((point - len) as usize))
    } else if point > 0 && point < len {
        let (whole, fraction) = significant.split_at(point as usize);
        format!("{whole}.{fraction}")
    } else {
        let (first, rest) = significant.split_at(1);
        let mantissa = if rest.is_empty() {
            first.to_string()
        } else {
            format!("{first}.{rest}")
        };
        format!("{mantissa}e{}", point - 1)
    };

    Some(if negative { format!("-{body}") } else { body })
}
