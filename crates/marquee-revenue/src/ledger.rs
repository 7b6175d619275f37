//! Payout ledger.
//!
//! Payout records are append-only and read-only here. Only `completed`
//! payouts reduce a balance; `pending` ones are reported for information.
//! Balances clamp at zero: overpayment is not an error.
//!
//! Without the payment feed only the payout side is known; see
//! [`payout_ledger`].

use std::collections::BTreeSet;

use marquee_types::report::{LedgerEntry, LedgerSection};
use marquee_types::{MinorUnits, PayoutRecord, PayoutStatus};

use crate::splits::NetReport;
use crate::{add, Result};

/// Net earnings for a recipient filter.
///
/// `Some(name)` is the partner net of that filmmaker's films (exact,
/// case-sensitive); `None` is the platform-wide partner net.
pub fn total_net_earnings(report: &NetReport, recipient: Option<&str>) -> Result<MinorUnits> {
    match recipient {
        Some(name) => report.partner_net_for(name),
        None => report.partner_net_total(),
    }
}

/// Sum of payouts in `status` matching the recipient filter.
pub fn paid_total(
    payouts: &[PayoutRecord],
    recipient: Option<&str>,
    status: PayoutStatus,
) -> Result<MinorUnits> {
    payouts
        .iter()
        .filter(|p| p.status == status)
        .filter(|p| recipient.map_or(true, |name| p.recipient == name))
        .try_fold(0, |acc, p| add(acc, p.amount))
}

/// `max(0, earned - paid)`.
pub fn clamp_balance(earned: MinorUnits, paid: MinorUnits) -> MinorUnits {
    earned.saturating_sub(paid)
}

/// Outstanding balance for a recipient filter.
pub fn outstanding_balance(
    report: &NetReport,
    payouts: &[PayoutRecord],
    recipient: Option<&str>,
) -> Result<MinorUnits> {
    let earned = total_net_earnings(report, recipient)?;
    let paid = paid_total(payouts, recipient, PayoutStatus::Completed)?;
    Ok(clamp_balance(earned, paid))
}

fn entry(report: &NetReport, payouts: &[PayoutRecord], recipient: &str) -> Result<LedgerEntry> {
    let earned = report.partner_net_for(recipient)?;
    let paid_out = paid_total(payouts, Some(recipient), PayoutStatus::Completed)?;
    let pending = paid_total(payouts, Some(recipient), PayoutStatus::Pending)?;
    Ok(LedgerEntry {
        recipient: recipient.to_string(),
        earned: Some(earned),
        paid_out,
        pending,
        balance: Some(clamp_balance(earned, paid_out)),
    })
}

fn payout_entry(payouts: &[PayoutRecord], recipient: &str) -> Result<LedgerEntry> {
    Ok(LedgerEntry {
        recipient: recipient.to_string(),
        earned: None,
        paid_out: paid_total(payouts, Some(recipient), PayoutStatus::Completed)?,
        pending: paid_total(payouts, Some(recipient), PayoutStatus::Pending)?,
        balance: None,
    })
}

/// `names` plus every recipient named by a film row or payout history.
fn recipients<'a>(
    mut names: BTreeSet<&'a str>,
    report: Option<&'a NetReport>,
    payouts: &'a [PayoutRecord],
) -> BTreeSet<&'a str> {
    if let Some(report) = report {
        names.extend(report.films.iter().filter_map(|row| row.filmmaker.as_deref()));
    }
    names.extend(payouts.iter().map(|p| p.recipient.as_str()));
    names
}

/// Ledger for one recipient, or for everyone.
///
/// Entries cover every recipient named by a film row, by `known_recipients`
/// (catalog filmmakers without revenue yet) or by payout history.
pub fn ledger_section<'a>(
    report: &NetReport,
    payouts: &[PayoutRecord],
    known_recipients: impl IntoIterator<Item = &'a str>,
    recipient: Option<&str>,
) -> Result<LedgerSection> {
    let entries = match recipient {
        Some(name) => vec![entry(report, payouts, name)?],
        None => recipients(known_recipients.into_iter().collect(), Some(report), payouts)
            .into_iter()
            .map(|name| entry(report, payouts, name))
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(LedgerSection {
        recipient: recipient.map(str::to_string),
        entries,
        outstanding_balance: Some(outstanding_balance(report, payouts, recipient)?),
    })
}

/// Ledger built from payout history alone.
///
/// Paid and pending amounts are exact; earnings and balances are `None`
/// because they need the payment feed.
pub fn payout_ledger<'a>(
    payouts: &'a [PayoutRecord],
    known_recipients: impl IntoIterator<Item = &'a str>,
    recipient: Option<&str>,
) -> Result<LedgerSection> {
    let entries = match recipient {
        Some(name) => vec![payout_entry(payouts, name)?],
        None => recipients(known_recipients.into_iter().collect(), None, payouts)
            .into_iter()
            .map(|name| payout_entry(payouts, name))
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(LedgerSection {
        recipient: recipient.map(str::to_string),
        entries,
        outstanding_balance: None,
    })
}
