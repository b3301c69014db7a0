use log::LevelFilter;

/// Per-module filters in `env_logger` syntax, e.g. `jobwatch::scraper=trace`.
const FILTER_ENV: &str = "JOBWATCH_LOG";

const NOISY_MODULES: [&str; 5] = [
    "headless_chrome",
    "tungstenite",
    "html5ever",
    "selectors",
    "hyper_util",
];

pub struct Logger;

impl Logger {
    pub fn init(level: LevelFilter) {
        let mut builder = colog::default_builder();
        builder.filter_level(level);

        for module in NOISY_MODULES {
            builder.filter_module(module, LevelFilter::Warn);
        }

        builder.parse_env(env_logger::Env::new().filter(FILTER_ENV));
        builder.init();
    }
}
