use super::error::RoiError;

const IRR_MAX_ITERATIONS: u32 = 100;
const IRR_TOLERANCE: f64 = 1e-10;
const IRR_LOWER_BOUND: f64 = -0.99;
const IRR_UPPER_BOUND: f64 = 10.0;

/// Discounted sum of `cash_flows`, where index `i` is received at period `i`.
pub fn present_value(cash_flows: &[f64], discount_rate: f64) -> Result<f64, RoiError> {
    if !discount_rate.is_finite() || discount_rate <= -1.0 {
        return Err(RoiError::InvalidRate {
            value: discount_rate,
        });
    }

    Ok(npv_unchecked(cash_flows, discount_rate))
}

fn npv_unchecked(cash_flows: &[f64], rate: f64) -> f64 {
    let base = 1.0 + rate;
    let mut discount = 1.0;
    let mut total = 0.0;
    for cf in cash_flows {
        total += cf / discount;
        discount *= base;
    }
    total
}

fn npv_derivative(cash_flows: &[f64], rate: f64) -> f64 {
    let base = 1.0 + rate;
    cash_flows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(t, cf)| -(t as f64) * cf / base.powi(t as i32 + 1))
        .sum()
}

/// Rate at which the cash flows have zero NPV. Newton-Raphson from 10%, with
/// bisection over [-99%, 1000%] when Newton leaves the bracket or stalls.
pub fn internal_rate_of_return(cash_flows: &[f64]) -> Option<f64> {
    let has_negative = cash_flows.iter().any(|cf| *cf < 0.0);
    let has_positive = cash_flows.iter().any(|cf| *cf > 0.0);
    if cash_flows.len() < 2 || !has_negative || !has_positive {
        return None;
    }

    let mut rate = 0.10;
    for _ in 0..IRR_MAX_ITERATIONS {
        let value = npv_unchecked(cash_flows, rate);
        if value.abs() < IRR_TOLERANCE {
            return Some(rate);
        }
        let slope = npv_derivative(cash_flows, rate);
        if slope == 0.0 || !slope.is_finite() {
            break;
        }
        let next = rate - value / slope;
        if !next.is_finite() || next <= IRR_LOWER_BOUND || next >= IRR_UPPER_BOUND {
            break;
        }
        if (next - rate).abs() < IRR_TOLERANCE {
            return Some(next);
        }
        rate = next;
    }

    bisect_irr(cash_flows)
}

fn bisect_irr(cash_flows: &[f64]) -> Option<f64> {
    let mut lo = IRR_LOWER_BOUND;
    let mut hi = IRR_UPPER_BOUND;
    let mut f_lo = npv_unchecked(cash_flows, lo);
    let f_hi = npv_unchecked(cash_flows, hi);
    if f_lo.signum() == f_hi.signum() {
        return None;
    }

    for _ in 0..200 {
        let mid = (lo + hi) * 0.5;
        let f_mid = npv_unchecked(cash_flows, mid);
        if f_mid.abs() < IRR_TOLERANCE || (hi - lo) < IRR_TOLERANCE {
            return Some(mid);
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    Some((lo + hi) * 0.5)
}

/// Months until the cumulative undiscounted flow turns non-negative, treating
/// each entry as one year and interpolating linearly inside the crossing year.
pub fn payback_period_months(cash_flows: &[f64]) -> Option<f64> {
    let mut cumulative = 0.0;
    for (year, cf) in cash_flows.iter().enumerate() {
        let before = cumulative;
        cumulative += cf;
        if cumulative >= 0.0 {
            if year == 0 {
                return Some(0.0);
            }
            let fraction = if *cf > 0.0 { -before / cf } else { 0.0 };
            return Some(12.0 * ((year - 1) as f64 + fraction));
        }
    }
    None
}

/// Compound annual growth of the period-0 outlay into the total undiscounted
/// value returned over the remaining periods.
pub fn annualized_return(cash_flows: &[f64]) -> Option<f64> {
    let (first, rest) = cash_flows.split_first()?;
    if *first >= 0.0 || rest.is_empty() {
        return None;
    }

    let outlay = -first;
    let ending = outlay + rest.iter().sum::<f64>();
    if ending <= 0.0 {
        return None;
    }
    Some((ending / outlay).powf(1.0 / rest.len() as f64) - 1.0)
}
