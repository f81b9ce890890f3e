use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tera_fmt::{FormatOptions, format_reader};
use tracing_subscriber::{EnvFilter, fmt};

/// Formats a Tera/Jinja HTML template and prints the result.
#[derive(Parser, Debug)]
#[command(name = "tera-fmt", version)]
struct Cli {
    /// Template to format; reads stdin when omitted
    file: Option<PathBuf>,

    /// Write `{{var}}` instead of `{{ var }}`
    #[arg(long)]
    no_expression_spacing: bool,

    #[arg(long, default_value_t = 2)]
    block_indentation: usize,

    /// Keep text nodes exactly as written
    #[arg(long)]
    preserve_whitespace: bool,

    #[arg(long, default_value_t = 80)]
    print_width: usize,

    #[arg(long, default_value_t = 2)]
    tab_width: usize,

    #[arg(long)]
    use_tabs: bool,
}

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let options = FormatOptions::new()
        .expression_spacing(!cli.no_expression_spacing)
        .block_indentation(cli.block_indentation)
        .preserve_whitespace(cli.preserve_whitespace)
        .print_width(cli.print_width)
        .tab_width(cli.tab_width)
        .use_tabs(cli.use_tabs);

    let formatted = match &cli.file {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("读取文件失败: {}", path.display()))?;
            format_reader(file, &options).with_context(|| format!("格式化失败: {}", path.display()))?
        }
        None => format_reader(io::stdin().lock(), &options).context("格式化标准输入失败")?,
    };

    io::stdout()
        .write_all(formatted.as_bytes())
        .context("写入标准输出失败")?;
    Ok(())
}
