use std::{
    env,
    process::exit,
};

use log::{error, LevelFilter};
use simple_logger::SimpleLogger;

use mixpak::{
    Mixpak,
    config::{Config, Mode},
};


fn main() {
    let args = env::args().skip(1).collect::<Vec<String>>();

    let cfg = match Config::new(&args) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("{err}");
            exit(2);
        }
    };

    let level =
        if cfg.quiet        { LevelFilter::Error }
        else if cfg.verbose { LevelFilter::Trace }
        else                { LevelFilter::Info  };
    SimpleLogger::new()
        .with_level(level)
        .init()
        .unwrap();

    let mode = cfg.mode;
    let result = match mode {
        Mode::Compress   => Mixpak::new(cfg).compress_file(),
        Mode::Decompress => Mixpak::new(cfg).extract_file(),
    };

    if let Err(err) = result {
        error!("{err}");
        exit(1);
    }
}
