//! Command-line interface for vocal-chopper
//!
//! Provides argument parsing using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Extract vocals from a track and chop them into samples
#[derive(Parser, Debug)]
#[command(name = "vocal-chopper", version, about)]
pub struct Cli {
    /// Audio file to process
    #[arg(value_name = "AUDIO", required_unless_present = "stdin_name")]
    pub input: Option<PathBuf>,

    /// Read the audio from stdin, naming it NAME (e.g. clip.wav)
    #[arg(long, value_name = "NAME", conflicts_with = "input")]
    pub stdin_name: Option<String>,

    /// Output folder for the chops (default: last used, else the input's folder)
    #[arg(short, long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Chop the input directly without extracting vocals
    #[arg(long)]
    pub skip_vocal_extraction: bool,

    /// Keep the extracted vocal stem next to the chops
    #[arg(long)]
    pub keep_vocal_file: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Interpreter used to run the tool script
    #[arg(long, value_name = "PATH")]
    pub runtime: Option<String>,

    /// Tool script to run (overrides the configured one)
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Print the final job snapshot as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the final job state to PATH as JSON
    #[arg(long, value_name = "PATH")]
    pub save_state: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_path_job() {
        let cli = Cli::try_parse_from([
            "vocal-chopper",
            "song.wav",
            "--dest",
            "out",
            "--keep-vocal-file",
        ])
        .unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("song.wav")));
        assert_eq!(cli.dest, Some(PathBuf::from("out")));
        assert!(cli.keep_vocal_file);
        assert!(!cli.skip_vocal_extraction);
    }

    #[test]
    fn stdin_name_replaces_input() {
        let cli =
            Cli::try_parse_from(["vocal-chopper", "--stdin-name", "clip.wav", "-d", "out"]).unwrap();
        assert_eq!(cli.stdin_name.as_deref(), Some("clip.wav"));
        assert!(cli.input.is_none());
    }

    #[test]
    fn requires_some_input() {
        assert!(Cli::try_parse_from(["vocal-chopper", "--dest", "out"]).is_err());
        assert!(
            Cli::try_parse_from(["vocal-chopper", "a.wav", "--stdin-name", "b.wav"]).is_err()
        );
    }

    #[test]
    fn verbose_counts() {
        let cli = Cli::try_parse_from(["vocal-chopper", "a.wav", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
