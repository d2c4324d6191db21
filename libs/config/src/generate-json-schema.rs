use schemars::schema_for;
use switchyard_config::SwitchyardConfig;

pub fn main() {
  let schema = schema_for!(SwitchyardConfig);

  match serde_json::to_string_pretty(&schema) {
    Ok(as_string) => println!("{}", as_string),
    Err(e) => {
      eprintln!("failed to serialize config schema: {}", e);
      std::process::exit(1);
    }
  }
}
