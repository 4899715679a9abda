use std::path::PathBuf;

use crate::error::ConfigError;


/// An enum containing each possible parsing state.
enum Parse {
    Mode,
    Input,
    DirOut,
    Threads,
}

/// Compress or decompress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Compress,
    Decompress,
}
impl Default for Mode {
    fn default() -> Mode {
        Mode::Compress
    }
}

/// A list of all user defined configuration settings.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub mode:      Mode,    // Compress or decompress
    pub input:     PathBuf, // File to be compressed or extracted
    pub user_out:  String,  // User specified output path (optional)
    pub threads:   usize,   // Worker count, 0 for hardware concurrency
    pub quiet:     bool,    // Suppresses output other than errors
    pub verbose:   bool,    // Per-probe progress output
    pub clobber:   bool,    // Allow clobbering files
}
impl Config {
    /// Create a new Config with the specified command line arguments.
    pub fn new(args: &[String]) -> Result<Config, ConfigError> {
        if args.is_empty() {
            print_program_info();
        }

        let mut parser    = Parse::Mode;
        let mut mode      = Mode::Compress;
        let mut input     = PathBuf::new();
        let mut user_out  = String::new();
        let mut threads   = 0usize;
        let mut quiet     = false;
        let mut verbose   = false;
        let mut clobber   = false;

        for arg in args.iter() {
            match arg.as_str() {
                "-out" | "-output-path" => {
                    parser = Parse::DirOut;
                    continue;
                }
                "-threads" => {
                    parser = Parse::Threads;
                    continue;
                }
                "-q" | "-quiet" => {
                    quiet = true;
                    continue;
                }
                "-v" | "-verbose" => {
                    verbose = true;
                    continue;
                }
                "-clb" | "-clobber" => {
                    clobber = true;
                    continue;
                }
                "help" | "-help" => print_program_info(),
                _ => {},
            }
            match parser {
                Parse::Mode => {
                    mode = match arg.as_str() {
                        "c" | "compress"   => Mode::Compress,
                        "d" | "decompress" => Mode::Decompress,
                        _ => return Err(ConfigError::InvalidMode(arg.to_string())),
                    };
                    parser = Parse::Input;
                }
                Parse::Input => {
                    input = PathBuf::from(arg);
                }
                Parse::DirOut => {
                    user_out = arg.to_string();
                    parser = Parse::Input;
                }
                Parse::Threads => {
                    threads = arg.parse::<usize>()
                        .map_err(|_| ConfigError::InvalidThreadCount(arg.to_string()))?;
                    parser = Parse::Input;
                }
            }
        }

        if input.as_os_str().is_empty() {
            return Err(ConfigError::NoInput);
        }
        if !input.exists() {
            return Err(ConfigError::InvalidInput(input));
        }

        Ok(
            Config {
                mode,     input,    user_out,
                threads,  quiet,    verbose,
                clobber,
            }
        )
    }
}


fn print_program_info() -> ! {
    println!();
    println!("Mixpak is a context mixing file compressor.");
    println!("It searches for the weighted byte-context model ensemble that");
    println!("arithmetic codes the input shortest, and decodes it back exactly.");
    println!();
    println!("USAGE: PROG_NAME [c|d] [file] [-out [path]] [-threads [n]] [-q] [-v] [-clb]");
    println!();
    println!("Option [c|d] must be first, all other options can be in any order.");
    println!();
    println!("OPTIONS:");
    println!("   c          Compress");
    println!("   d          Decompress");
    println!("  -out        Specify output path");
    println!("  -threads    Number of worker threads (0 - hardware concurrency)");
    println!("  -q          Suppresses output other than errors");
    println!("  -v          Print per-probe search progress");
    println!("  -clb        Allow file clobbering");
    println!();
    println!("EXAMPLE:");
    println!("  Compress file [foo.txt] to [foo.mxp] with 4 threads:");
    println!();
    println!("      mixpak c foo.txt -threads 4");
    println!();
    println!("  Decompress it:");
    println!();
    println!("      mixpak d foo.mxp -out foo.txt -clb");
    std::process::exit(0);
}


#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_compress_invocation() {
        let cfg = Config::new(&args(&["c", "Cargo.toml", "-threads", "4", "-q"])).unwrap();
        assert_eq!(cfg.mode, Mode::Compress);
        assert_eq!(cfg.input, PathBuf::from("Cargo.toml"));
        assert_eq!(cfg.threads, 4);
        assert!(cfg.quiet);
        assert!(!cfg.clobber);
    }

    #[test]
    fn parses_output_path() {
        let cfg = Config::new(&args(&["d", "Cargo.toml", "-out", "result.bin"])).unwrap();
        assert_eq!(cfg.mode, Mode::Decompress);
        assert_eq!(cfg.user_out, "result.bin");
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(matches!(
            Config::new(&args(&["x", "Cargo.toml"])),
            Err(ConfigError::InvalidMode(_))
        ));
    }

    #[test]
    fn rejects_missing_input() {
        assert!(matches!(
            Config::new(&args(&["c"])),
            Err(ConfigError::NoInput)
        ));
    }

    #[test]
    fn rejects_bad_thread_count() {
        assert!(matches!(
            Config::new(&args(&["c", "Cargo.toml", "-threads", "lots"])),
            Err(ConfigError::InvalidThreadCount(_))
        ));
    }
}
