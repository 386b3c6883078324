//! Number formatting shared by the topology and table writers.

/// Shortest decimal form of `value` that always carries a fractional part (`1.0`, `0.1234`).
pub fn short_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Scientific notation with `digits` mantissa decimals and a signed, two-digit exponent
/// (`3.678794412E-01`).
pub fn scientific(value: f64, digits: usize) -> String {
    let raw = format!("{value:.digits$E}");
    match raw.split_once('E') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}E{sign}{:02}", exp.abs())
            }
            Err(_) => raw,
        },
        None => raw,
    }
}

/// Abscissa column of a tabulated potential: four decimals, right-padded with zeros to ten
/// characters.
pub fn table_abscissa(r: f64) -> String {
    format!("{:0<10}", format!("{r:.4}"))
}
