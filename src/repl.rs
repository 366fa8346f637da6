use anyhow::Result;
use crossterm::style::Stylize;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::agents::Agent;

const RULE: &str = "====================";

fn is_exit(line: &str) -> bool {
    matches!(line.to_lowercase().as_str(), "exit" | "quit")
}

/// Read instructions line by line and hand each one to `agent` until `exit`, `quit` or end of input
pub async fn run<R, W>(agent: &dyn Agent, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(
        out,
        "{} Type 'exit' to leave.\n",
        format!("{} REPL.", agent.name()).cyan().bold()
    )?;

    let mut lines = input.lines();
    loop {
        write!(out, "{} ", "➡️  You:".green().bold())?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit(line) {
            writeln!(out, "Leaving the REPL...")?;
            break;
        }

        match agent.run(line).await {
            Ok(run) => {
                writeln!(out, "\n{}\n", "===== RESULT =====".bold())?;
                writeln!(out, "{}", run.output)?;
            }
            Err(e) => {
                tracing::debug!("request failed: {:?}", e);
                writeln!(out, "{}", "🚨 Error while running the request:".red().bold())?;
                writeln!(out, "{:#}", e)?;
            }
        }
        writeln!(out, "\n{}\n", RULE)?;
    }

    Ok(())
}
