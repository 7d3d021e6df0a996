use super::PersistenceError;
use super::restart::set_records;
use crate::core::forcefield::params::CoefficientTable;
use std::io::{BufRead, Write};

/// Writes one `index epsilon sigma lambda epsdihed` line per dihedral type.
pub fn write_data<W: Write>(
    table: &CoefficientTable,
    writer: &mut W,
) -> Result<(), PersistenceError> {
    for (idx, record) in set_records(table)?.into_iter().enumerate() {
        writeln!(
            writer,
            "{} {} {} {} {}",
            idx + 1,
            format_g(record.epsilon()),
            format_g(record.sigma()),
            format_g(record.lambda()),
            format_g(record.epsdihed())
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Applies every coefficient line of a data section to `table` and returns the number
/// of lines applied. Blank lines and `#` comments are skipped.
pub fn read_data<R: BufRead>(
    reader: R,
    table: &mut CoefficientTable,
) -> Result<usize, PersistenceError> {
    let mut applied = 0;
    for (line_num, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let args: Vec<&str> = content.split_whitespace().collect();
        if args[0].parse::<usize>().is_err() {
            return Err(PersistenceError::MalformedLine {
                line: line_num + 1,
                content: content.to_string(),
            });
        }

        table
            .coeff(&args)
            .map_err(|source| PersistenceError::Coefficient {
                line: line_num + 1,
                source,
            })?;
        applied += 1;
    }
    Ok(applied)
}

/// Formats like C's `%g`: six significant digits, trailing zeros removed, scientific
/// notation when the exponent is below -4 or at least 6.
pub fn format_g(value: f64) -> String {
    const PRECISION: i32 = 6;

    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}
