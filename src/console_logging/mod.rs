// OPCUA for Rust
// SPDX-License-Identifier: MPL-2.0
// Copyright (C) 2017-2024 Adam Lock

//! Console logger for binaries and samples built on the monitored item manager. Filtering is
//! taken from `RUST_OPCUA_LOG` so output from other tools using `RUST_LOG` stays out.

use std::{
    fmt,
    io::Write,
    sync::atomic::{AtomicBool, Ordering},
};

use env_logger::{fmt::Color, Builder, Env};

/// Environment variable that controls filtering
pub const LOG_ENV: &str = "RUST_OPCUA_LOG";

struct Pad<T> {
    value: T,
    width: usize,
}

impl<T: fmt::Display> fmt::Display for Pad<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{: <width$}", self.value, width = self.width)
    }
}

/// Initialises logging with no default filter, i.e. only what `RUST_OPCUA_LOG` asks for.
pub fn init() {
    init_with_default_filter(None)
}

/// Initialises logging, using `default_filter` when `RUST_OPCUA_LOG` is not set. Subsequent
/// calls do nothing.
pub fn init_with_default_filter(default_filter: Option<&str>) {
    lazy_static! {
        static ref INITIALISED: AtomicBool = AtomicBool::new(false);
    }

    if INITIALISED.swap(true, Ordering::Relaxed) {
        return;
    }

    let env = match default_filter {
        Some(filter) => Env::new().filter_or(LOG_ENV, filter),
        None => Env::new().filter(LOG_ENV),
    };
    let mut builder = Builder::from_env(env);
    builder.format(|f, record| {
        let now = chrono::Utc::now();
        let time_fmt = now.format("%Y-%m-%d %H:%M:%S%.3f");

        let mut style = f.style();
        match record.metadata().level() {
            log::Level::Error => {
                // White on red
                style.set_color(Color::White);
                style.set_bg(Color::Red);
            }
            log::Level::Warn => {
                style.set_color(Color::Yellow);
            }
            log::Level::Info => {
                style.set_color(Color::Cyan);
            }
            log::Level::Debug => {
                style.set_color(Color::Green);
            }
            log::Level::Trace => {
                // Grey
                style.set_color(Color::Ansi256(8));
            }
        }
        let level = style.value(Pad {
            value: record.level(),
            width: 5,
        });

        let mut style = f.style();
        let target = style.set_bold(true).value(Pad {
            value: record.target(),
            width: 48,
        });

        writeln!(f, "{} {} {} {}", time_fmt, level, target, record.args())
    });
    builder.init();
    info!(
        "Logging is enabled, use {} environment variable to control filtering, logging level",
        LOG_ENV
    );
}
