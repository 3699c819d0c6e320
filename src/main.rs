//! hello-agents 命令行入口
//!
//! 加载配置（TOML + AGENTS__* + LLM_*），按子命令构建 ReAct / Plan-and-Solve / Reflection Agent，
//! 运行一次并打印最终答案；没有答案时以退出码 2 结束。

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use hello_agents::config::load_config;
use hello_agents::{observability, Agent, AgentBuilder, RunOutcome};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "hello-agents", version, about = "ReAct / Plan-and-Solve / Reflection agents")]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 模型后端：openai / local / mock
    #[arg(long, global = true)]
    provider: Option<String>,

    #[arg(long, global = true)]
    max_steps: Option<usize>,

    /// 把运行事件以 JSON 行输出到 stderr
    #[arg(long, global = true)]
    events: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Think / Act / Observe 循环，可调用工具
    React { question: String },
    /// 先规划再逐步执行
    Plan { question: String },
    /// 初稿 -> 评审 -> 改进
    Reflect {
        task: String,
        #[arg(long)]
        max_iterations: Option<usize>,
    },
    /// 列出内置工具
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    observability::init();
    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    cfg.apply_llm_env();
    if let Some(p) = cli.provider {
        cfg.llm.provider = p;
    }
    if let Some(n) = cli.max_steps {
        cfg.agent.max_steps = n;
    }
    if let Command::Reflect {
        max_iterations: Some(n),
        ..
    } = &cli.command
    {
        cfg.agent.max_iterations = *n;
    }
    cfg.validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid config")?;

    let max_steps = cfg.agent.max_steps;
    let mut builder = AgentBuilder::new(cfg);

    let mut printer = None;
    if cli.events {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        builder = builder.with_event_tx(tx);
        printer = Some(tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                if let Ok(line) = serde_json::to_string(&ev) {
                    eprintln!("{line}");
                }
            }
        }));
    }

    let (agent, input): (Box<dyn Agent>, String) = match cli.command {
        Command::Tools => {
            println!("{}", builder.tools().describe_all());
            return Ok(ExitCode::SUCCESS);
        }
        Command::React { question } => (
            Box::new(builder.build_react().context("Failed to build agent")?),
            question,
        ),
        Command::Plan { question } => (
            Box::new(builder.build_plan().context("Failed to build agent")?),
            question,
        ),
        Command::Reflect { task, .. } => (
            Box::new(builder.build_reflection().context("Failed to build agent")?),
            task,
        ),
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let result = agent
        .run_with_cancel(&input, cancel)
        .await
        .with_context(|| format!("{} run failed", agent.name()));

    // 发送端全部释放后事件流才会结束；等待打印完最后的 Finished
    drop(agent);
    drop(builder);
    if let Some(handle) = printer {
        let _ = handle.await;
    }
    let report = result?;

    Ok(match report.outcome {
        RunOutcome::Finished(answer) => {
            println!("{answer}");
            ExitCode::SUCCESS
        }
        RunOutcome::Exhausted => {
            println!("could not complete within step budget ({max_steps} steps)");
            ExitCode::from(2)
        }
        RunOutcome::Aborted(reason) => {
            println!("{reason}");
            ExitCode::from(2)
        }
    })
}
