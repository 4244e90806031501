use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tinypng-shrink",
    about = "Shrink PNG images through the TinyPNG web service",
    long_about = "tinypng-shrink uploads PNG files to TinyPNG one after another and either prints \
                  the URLs of the shrunk images or downloads them as shrunk_<name>. \
                  Non-PNG or missing files are skipped with a warning.",
    version,
    after_help = "EXAMPLES:\n  \
    tinypng-shrink -f logo.png\n  \
    tinypng-shrink -d ./small -p -- *.png\n  \
    tinypng-shrink -k YOUR_API_KEY -f a.png -f b.png\n\n\
    The API key is read from ~/.tinypng when -k is not given; if that file is missing you are \
    prompted once and the key is saved there with owner-only permissions."
)]
pub struct Args {
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help = "PNG file to shrink (repeatable)"
    )]
    pub files: Vec<PathBuf>,

    #[arg(
        short = 'd',
        long = "download",
        value_name = "DIR",
        help = "Download shrunk files into DIR instead of printing URLs"
    )]
    pub download: Option<PathBuf>,

    #[arg(
        short = 'k',
        long = "key",
        value_name = "KEY",
        help = "TinyPNG API key for this run (not saved)"
    )]
    pub key: Option<String>,

    #[arg(
        short = 'p',
        long = "print",
        help = "Print result URLs even when downloading"
    )]
    pub print: bool,

    #[arg(short = 'q', long, help = "Suppress progress output", conflicts_with = "verbose")]
    pub quiet: bool,

    #[arg(short = 'v', long, help = "Show detailed progress")]
    pub verbose: bool,

    #[arg(
        last = true,
        value_name = "FILES",
        help = "Files after `--` are all treated as PNG files to shrink"
    )]
    pub rest: Vec<PathBuf>,
}

impl Args {
    /// Every file argument in the order given: `-f` values, then those after `--`.
    pub fn input_files(&self) -> Vec<PathBuf> {
        self.files.iter().chain(self.rest.iter()).cloned().collect()
    }
}
