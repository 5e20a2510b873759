//! This module provides custom filters for the minijinja templating engine

use std::str::FromStr;

use minijinja::{
    Error, ErrorKind,
    value::{Value, ValueKind},
};
use rust_decimal::{Decimal, RoundingStrategy, prelude::FromPrimitive};

/// A minijinja filter that formats an amount with two decimals and thousands
/// separators.
///
/// # Example
///
/// ```jinja
/// £{{ item.price | money }}   {# £1,204.50 #}
/// ```
pub fn money(value: Value) -> Result<String, Error> {
    let amount = match value.kind() {
        ValueKind::Number => {
            let float = f64::try_from(value.clone())?;
            Decimal::from_f64(float).ok_or_else(|| {
                Error::new(ErrorKind::InvalidOperation, format!("{float} is not a finite amount"))
            })?
        }
        ValueKind::String => {
            let text = value.as_str().unwrap_or_default();
            Decimal::from_str(text.trim().trim_start_matches('£').replace(',', "").as_str())
                .map_err(|e| {
                    Error::new(
                        ErrorKind::InvalidOperation,
                        format!("Failed to parse amount '{text}': {e}"),
                    )
                })?
        }
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                "money filter can only be applied to numbers or numeric strings.",
            ));
        }
    };

    Ok(group_thousands(amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)))
}

fn group_thousands(amount: Decimal) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}
