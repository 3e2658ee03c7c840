use anyhow::Context;
use calccache::core::init_logger;
use calccache::data::CacheManager;
use calccache::models::CalculatorTool;
use calccache::services::HttpCalculator;
use calccache::utils::config::load_config;
use clap::Parser;
use serde::Serialize;

mod cli;
use cli::{parse_fields, tool_context, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("错误: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref()).context("加载配置失败")?;
    init_logger(&config.log)?;

    let locale = cli.locale_bundle(&config.locale);
    let manager = CacheManager::from_config(&config).context("初始化缓存失败")?;

    match cli.command {
        Commands::Key { tool, fields } => {
            let input = parse_fields(&fields)?;
            let preview = manager.preview_key(&input, &tool_context(&tool, locale));
            print_json(&preview)?;
        }
        Commands::Compute {
            tool,
            fields,
            endpoint,
        } => {
            let input = parse_fields(&fields)?;
            let mut http = config.http.clone();
            if endpoint.is_some() {
                http.endpoint = endpoint;
            }
            let calculator = HttpCalculator::from_settings(&http)?;
            let outcome = manager
                .get_or_compute_with(&calculator, &input, &tool_context(&tool, locale))
                .await
                .context("计算失败")?;
            if outcome.from_cache {
                eprintln!("结果来自缓存");
            }
            print_json(&outcome)?;
        }
        Commands::Stats { tool } => {
            let stats: Vec<_> = match tool {
                Some(tool) => vec![manager.stats(&tool)],
                None => CalculatorTool::all()
                    .iter()
                    .map(|t| manager.stats(&t.id))
                    .collect(),
            };
            print_json(&stats)?;
        }
        Commands::Clear { tool, all } => match tool {
            Some(tool) => {
                manager.clear(&tool);
                println!("已清空 {tool} 的缓存");
            }
            None if all => {
                manager.clear_all();
                println!("已清空所有缓存");
            }
            None => anyhow::bail!("请指定 --tool 或 --all"),
        },
        Commands::Tools => print_json(&CalculatorTool::all())?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
