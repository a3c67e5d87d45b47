//! Module-frequency (`.freq`) profile parsing.

use rustc_hash::FxHashMap;

use crate::error::{TraceError, TraceResult};

/// Parse a frequency profile: one module per line, name first, aggregate
/// execution count in the tenth field.
pub fn parse_freq(text: &str) -> TraceResult<FxHashMap<String, u64>> {
    let mut freqs = FxHashMap::default();
    for (lineno, raw) in text.lines().enumerate() {
        let lineno = lineno + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 10 {
            return Err(TraceError::malformed(
                lineno,
                format!("frequency line has {} fields, expected 10", tokens.len()),
            ));
        }
        let freq: u64 = tokens[9]
            .parse()
            .map_err(|_| TraceError::malformed(lineno, format!("bad frequency '{}'", tokens[9])))?;
        freqs.insert(tokens[0].to_string(), freq);
    }
    Ok(freqs)
}
