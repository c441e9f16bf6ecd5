pub mod ast;
pub mod compiler;
pub mod config;
pub mod dsp;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod preset;
pub mod sequencer;
pub mod theory;
pub mod token;

use crate::dsp::engine::{ChordGenerator, ChordRequest};
use crate::error::ShallotError;
use crate::lexer::Lexer;
use crate::parser::Parser;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the shallot_core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Parse sequence text into its syntax tree.
pub fn parse(input: &str) -> Result<ast::SequenceText, ShallotError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser::new(tokens);
    Ok(parser.parse_sequence()?)
}

/// A generator with built-in tables and the rack described by `rack_json`.
/// An empty string keeps the single default oscillator.
fn generator_from_rack(rack_json: &str) -> Result<ChordGenerator, ShallotError> {
    let mut generator = ChordGenerator::new();
    if !rack_json.trim().is_empty() {
        preset::import_rack(&mut generator, rack_json)?;
    }
    Ok(generator)
}

/// WASM-exposed: render a chord for a rack to a 16-bit stereo WAV byte array.
#[wasm_bindgen]
pub fn render_chord_wav(rack_json: &str, request_json: &str) -> Result<Vec<u8>, JsValue> {
    let generator = generator_from_rack(rack_json).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let request: ChordRequest =
        serde_json::from_str(request_json).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let buffer = generator.generate_chord(&request);
    Ok(dsp::renderer::render_wav(&buffer, generator.sample_rate))
}

/// WASM-exposed: compile sequence text against a rack into a list of steps.
/// Errors are returned as an annotated report of the offending line.
#[wasm_bindgen]
pub fn compile_sequence(text: &str, rack_json: &str) -> Result<JsValue, JsValue> {
    let generator = generator_from_rack(rack_json).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let steps = compiler::compile_source(text, &generator)
        .map_err(|e| JsValue::from_str(&error::render_report(text, &e)))?;
    serde_wasm_bindgen::to_value(&steps).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: re-emit sequence text in canonical form (sharp spellings,
/// renumbered steps, unknown oscillators rewritten as master).
#[wasm_bindgen]
pub fn normalize_sequence_text(text: &str, rack_json: &str) -> Result<String, JsValue> {
    normalize(text, rack_json).map_err(|e| JsValue::from_str(&error::render_report(text, &e)))
}

fn normalize(text: &str, rack_json: &str) -> Result<String, ShallotError> {
    let generator = generator_from_rack(rack_json)?;
    let steps = compiler::compile_source(text, &generator)?;
    Ok(compiler::serialize(&steps, &generator))
}
