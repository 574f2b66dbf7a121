//! Prints the Crux OpenAPI document as JSON.
//!
//! Usage:
//!   cargo run -p crux-api --bin generate-openapi > openapi.json

use crux_api::ApiDoc;
use utoipa::OpenApi;

fn main() {
    let doc = ApiDoc::openapi();

    match serde_json::to_string_pretty(&doc) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI document: {}", e);
            std::process::exit(1);
        }
    }
}
