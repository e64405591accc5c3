//! Parsing functions for CLI arguments.

/// Parse a comma-separated list of clip limit values
///
/// # Arguments
/// * `list` - A string like "1.0,1.5,2.0" with positive values
///
/// # Returns
/// The clip limit candidates in their given order
pub fn parse_clip_limits(list: &str) -> Result<Vec<f64>, String> {
    let mut values = Vec::new();
    for part in list.split(',') {
        let value = part
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Invalid clip limit value: {}", part))?;
        if value <= 0.0 || !value.is_finite() {
            return Err(format!("Clip limit {} must be positive", value));
        }
        values.push(value);
    }
    if values.is_empty() {
        return Err("Clip limit list must not be empty".to_string());
    }
    Ok(values)
}

/// Parse a comma-separated list of tile sizes in pixels
///
/// # Arguments
/// * `list` - A string like "8,16,32" with positive integers
///
/// # Returns
/// The tile size candidates in their given order
pub fn parse_tile_sizes(list: &str) -> Result<Vec<u32>, String> {
    let mut values = Vec::new();
    for part in list.split(',') {
        let value = part
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid tile size: {}", part))?;
        if value == 0 {
            return Err("Tile size must be at least 1".to_string());
        }
        values.push(value);
    }
    if values.is_empty() {
        return Err("Tile size list must not be empty".to_string());
    }
    Ok(values)
}
