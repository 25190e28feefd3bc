//! 命令行参数

use clap::Parser;

/// Linkpulse - URL shortener with click analytics
#[derive(Parser, Debug)]
#[command(name = "linkpulse")]
#[command(version)]
#[command(about = "A URL shortener backend with click analytics", long_about = None)]
pub struct Cli {
    /// 配置文件路径
    #[arg(long, short = 'c', default_value = "config.toml")]
    pub config: String,

    /// 打印示例配置后退出
    #[arg(long)]
    pub generate_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["linkpulse"]);
        assert_eq!(cli.config, "config.toml");
        assert!(!cli.generate_config);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from(["linkpulse", "-c", "/etc/lp.toml", "--generate-config"]);
        assert_eq!(cli.config, "/etc/lp.toml");
        assert!(cli.generate_config);
    }
}
