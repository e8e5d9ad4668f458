//! `codebox analyze`: ask the LLM a question about a context document.

use std::{
    io::{self, Read, Write},
    path::PathBuf,
};

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use is_terminal::IsTerminal;

use crate::{
    config::Config,
    llm::{ChatMessage, LlmClient, StreamEvent},
    printer::MarkdownPrinter,
};

pub async fn run(
    cfg: &Config,
    query: &str,
    context: Option<PathBuf>,
    model: Option<String>,
    no_md: bool,
) -> Result<()> {
    let context = read_context(context)?;
    let mut client = LlmClient::from_config(cfg)?;
    if let Some(m) = model {
        client = client.with_model(m);
    }
    let markdown = !no_md && cfg.get_bool("PRETTIFY_MARKDOWN");

    println!("{}\n\n{}\n", query, context);

    let mut stream = client.message_stream(vec![ChatMessage::user(build_prompt(query, &context))]);
    let mut completion = String::new();
    while let Some(ev) = stream.next().await {
        match ev? {
            StreamEvent::Text(t) => {
                if markdown {
                    completion.push_str(&t);
                } else {
                    print!("{}", t);
                    let _ = io::stdout().flush();
                }
            }
            StreamEvent::Done => break,
        }
    }

    if markdown {
        MarkdownPrinter::default().print(&completion);
    } else {
        println!();
    }
    Ok(())
}

pub fn build_prompt(query: &str, context: &str) -> String {
    format!("{}\n\n{}", query, context)
}

fn read_context(path: Option<PathBuf>) -> Result<String> {
    if let Some(p) = path {
        return std::fs::read_to_string(&p)
            .with_context(|| format!("failed to read context file {}", p.display()));
    }
    if io::stdin().is_terminal() {
        bail!("Provide a context with --context FILE or via stdin");
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_puts_query_before_context() {
        assert_eq!(build_prompt("Summarize", "fn main() {}"), "Summarize\n\nfn main() {}");
    }

    #[test]
    fn context_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("ctx.rs");
        std::fs::write(&p, "let x = 1;").unwrap();
        assert_eq!(read_context(Some(p)).unwrap(), "let x = 1;");
    }
}
