use anyhow::bail;
use calccache::models::{CacheContext, CalculatorTool, InputRecord, LocaleBundle};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "calccache")]
#[command(about = "计算器结果缓存：查看缓存键、读穿计算、统计与清理")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "配置文件路径（默认 ~/.calccache/config.toml）")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "国家代码，如 US")]
    pub country: Option<String>,

    #[arg(long, global = true, help = "货币代码，如 USD")]
    pub currency: Option<String>,

    #[arg(long, global = true, help = "语言，如 en")]
    pub language: Option<String>,

    #[arg(long, global = true, help = "区域标签，如 en-US")]
    pub locale: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "打印缓存键和规范化后的输入（不查询缓存）")]
    Key {
        #[arg(long, short = 't', help = "计算器工具 ID")]
        tool: String,
        #[arg(long = "field", short = 'f', value_name = "NAME=VALUE", help = "表单字段，可重复")]
        fields: Vec<String>,
    },
    #[command(about = "读穿缓存：命中直接返回，未命中时调用远程计算")]
    Compute {
        #[arg(long, short = 't', help = "计算器工具 ID")]
        tool: String,
        #[arg(long = "field", short = 'f', value_name = "NAME=VALUE", help = "表单字段，可重复")]
        fields: Vec<String>,
        #[arg(long, help = "计算端点 URL（覆盖配置）")]
        endpoint: Option<String>,
    },
    #[command(about = "显示命名空间缓存统计")]
    Stats {
        #[arg(long, short = 't', help = "计算器工具 ID，省略时显示全部内置工具")]
        tool: Option<String>,
    },
    #[command(about = "清空缓存")]
    Clear {
        #[arg(long, short = 't', help = "计算器工具 ID", conflicts_with = "all")]
        tool: Option<String>,
        #[arg(long, help = "清空所有命名空间")]
        all: bool,
    },
    #[command(about = "列出内置计算器工具")]
    Tools,
}

impl Cli {
    /// 配置中的本地化信息叠加命令行覆盖
    pub fn locale_bundle(&self, base: &LocaleBundle) -> LocaleBundle {
        let pick = |arg: &Option<String>, fallback: &str| {
            arg.clone().unwrap_or_else(|| fallback.to_string())
        };
        LocaleBundle {
            country: pick(&self.country, &base.country),
            currency: pick(&self.currency, &base.currency),
            language: pick(&self.language, &base.language),
            locale: pick(&self.locale, &base.locale),
        }
    }
}

/// 工具 ID 对应的缓存上下文
pub fn tool_context(tool: &str, locale: LocaleBundle) -> CacheContext {
    CacheContext::for_tool(&CalculatorTool::resolve(tool), locale)
}

/// 解析 `--field name=value` 列表
pub fn parse_fields(fields: &[String]) -> anyhow::Result<InputRecord> {
    let mut input = InputRecord::new();
    for field in fields {
        if input.parse_assignment(field).is_none() {
            bail!("字段格式应为 NAME=VALUE: {field}");
        }
    }
    Ok(input)
}
