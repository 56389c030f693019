use caravan_types::FeeSnapshot;

/// Fee parameters for a resend of the same nonce.
///
/// Takes the fresher of the market estimate and the previous parameters
/// bumped by `bump_percent`, per field. The result is strictly greater than
/// `previous` in both fields, so a replacement is always accepted by the
/// fee market.
pub fn next_fees(
    estimate: Option<FeeSnapshot>,
    previous: FeeSnapshot,
    bump_percent: u64,
) -> FeeSnapshot {
    let bump = |prev: u128| prev + prev * bump_percent as u128 / 100 + 1;

    let floor = FeeSnapshot {
        max_fee_per_gas: bump(previous.max_fee_per_gas),
        max_priority_fee_per_gas: bump(previous.max_priority_fee_per_gas),
    };

    match estimate {
        Some(estimate) => FeeSnapshot {
            max_fee_per_gas: estimate.max_fee_per_gas.max(floor.max_fee_per_gas),
            max_priority_fee_per_gas: estimate
                .max_priority_fee_per_gas
                .max(floor.max_priority_fee_per_gas),
        },
        None => floor,
    }
}
