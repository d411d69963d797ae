use serde_json::json;
use skyview::config::Config;

fn main() {
    let config = Config::default();
    let json = json!(config);
    println!(
        "{}",
        serde_json::to_string_pretty(&json).expect("default config is serializable")
    );
}
