use serde::{Deserialize, Serialize};

/// 未登记工具使用的默认数值字段
pub const DEFAULT_NUMERIC_FIELDS: &[&str] = &[
    "amount",
    "principal",
    "income",
    "salary",
    "balance",
    "deposit",
    "contribution",
    "age",
    "years",
    "months",
    "term",
    "duration",
    "rate",
];

/// 计算器工具定义
///
/// 每个工具对应一个缓存命名空间，`numeric_fields` 是该计算领域内
/// 需要做数值归一化的封闭字段列表。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorTool {
    pub id: String,
    pub name: String,
    pub category: String,
    pub numeric_fields: Vec<String>,
}

impl CalculatorTool {
    /// 获取所有工具
    pub fn all() -> Vec<CalculatorTool> {
        vec![
            CalculatorTool::loan(),
            CalculatorTool::mortgage(),
            CalculatorTool::retirement(),
            CalculatorTool::savings(),
        ]
    }

    /// 根据 ID 获取工具
    pub fn by_id(id: &str) -> Option<CalculatorTool> {
        Self::all().into_iter().find(|t| t.id == id)
    }

    /// 未登记工具的兜底定义（使用默认数值字段）
    pub fn generic(id: &str) -> CalculatorTool {
        CalculatorTool {
            id: id.to_string(),
            name: id.to_string(),
            category: "general".to_string(),
            numeric_fields: to_owned_fields(DEFAULT_NUMERIC_FIELDS),
        }
    }

    /// 贷款计算器
    pub fn loan() -> CalculatorTool {
        CalculatorTool {
            id: "loan".to_string(),
            name: "Loan Calculator".to_string(),
            category: "finance".to_string(),
            numeric_fields: to_owned_fields(&["amount", "rate", "term", "months", "fees"]),
        }
    }

    /// 房贷计算器
    pub fn mortgage() -> CalculatorTool {
        CalculatorTool {
            id: "mortgage".to_string(),
            name: "Mortgage Calculator".to_string(),
            category: "finance".to_string(),
            numeric_fields: to_owned_fields(&[
                "price",
                "down_payment",
                "rate",
                "term",
                "property_tax",
                "insurance",
            ]),
        }
    }

    /// 退休规划
    pub fn retirement() -> CalculatorTool {
        CalculatorTool {
            id: "retirement".to_string(),
            name: "Retirement Planner".to_string(),
            category: "planning".to_string(),
            numeric_fields: to_owned_fields(&[
                "age",
                "retirement_age",
                "income",
                "savings",
                "contribution",
                "return_rate",
                "years",
            ]),
        }
    }

    /// 储蓄计算器
    pub fn savings() -> CalculatorTool {
        CalculatorTool {
            id: "savings".to_string(),
            name: "Savings Calculator".to_string(),
            category: "planning".to_string(),
            numeric_fields: to_owned_fields(&["deposit", "contribution", "rate", "years"]),
        }
    }

    /// 查找工具，未登记时回退到通用定义
    pub fn resolve(id: &str) -> CalculatorTool {
        Self::by_id(id).unwrap_or_else(|| Self::generic(id))
    }
}

fn to_owned_fields(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}
