use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Download a Domestika course using your browser session")]
pub struct Cli {
    #[clap(help = "Full url of the course to download")]
    pub url: String,

    #[clap(
        short,
        long,
        value_enum,
        help = "Browser to read cookies from",
        default_value_t = Browser::Firefox
    )]
    pub browser: Browser,

    #[clap(
        short,
        long,
        help = "Preferred video resolution (e.g. 1080, 720)",
        default_value = "1080"
    )]
    pub quality: String,

    #[clap(
        short,
        long,
        help = "Preferred subtitle language (e.g. Español, English)",
        default_value = "Español"
    )]
    pub lang: String,

    #[clap(long, help = "Path to optional settings file", default_value = ".dmstk-dl.yml")]
    pub config: PathBuf,
}

/// Browsers cookies can be read from
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Firefox,
    Chrome,
    Edge,
    Brave,
}
