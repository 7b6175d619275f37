//! Partner/platform revenue splits.
//!
//! Gross revenue is divided between the partner (filmmaker or festival
//! programmer) and the platform:
//!
//! - **Partner**: default 70% ([`ShareRatio::DEFAULT`])
//! - **Platform**: the remainder
//!
//! Ratios are basis points. The partner's net is computed first and
//! truncated toward zero; the platform cut is whatever remains, so
//! `net + platform_cut == gross` holds exactly for every amount.
//!
//! Festival sectors (passes, blocks, watch parties) may carry their own
//! ratio; without an override they use the default.

use std::collections::HashMap;

use marquee_types::report::{BlockRow, CategoryTotals, FilmRow, SectorRows, SplitFigures};
use marquee_types::revenue::Sector;
use marquee_types::{Category, MinorUnits, BPS_DENOMINATOR, DEFAULT_PARTNER_SHARE_BPS};
use serde::{Deserialize, Serialize};

use crate::aggregate::RevenueSummary;
use crate::{add, Result, RevenueError};

/// Partner share of gross revenue, in basis points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ShareRatio(u16);

impl ShareRatio {
    /// 70% to the partner.
    pub const DEFAULT: ShareRatio = ShareRatio(DEFAULT_PARTNER_SHARE_BPS);

    /// Validate a basis-point ratio.
    ///
    /// # Errors
    ///
    /// - [`RevenueError::InvalidRatio`] if `bps` exceeds 10 000
    pub fn from_bps(bps: u32) -> Result<Self> {
        if u64::from(bps) > BPS_DENOMINATOR {
            return Err(RevenueError::InvalidRatio { bps });
        }
        u16::try_from(bps)
            .map(ShareRatio)
            .map_err(|_| RevenueError::InvalidRatio { bps })
    }

    pub fn bps(self) -> u16 {
        self.0
    }
}

impl Default for ShareRatio {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for ShareRatio {
    type Error = RevenueError;

    fn try_from(bps: u32) -> Result<Self> {
        Self::from_bps(bps)
    }
}

impl From<ShareRatio> for u32 {
    fn from(ratio: ShareRatio) -> u32 {
        u32::from(ratio.0)
    }
}

/// Split a gross amount.
pub fn split(gross: MinorUnits, ratio: ShareRatio) -> SplitFigures {
    // Widened so `gross * bps` cannot overflow; the quotient is <= gross.
    let net = (u128::from(gross) * u128::from(ratio.0) / u128::from(BPS_DENOMINATOR)) as u64;
    SplitFigures {
        gross,
        net,
        platform_cut: gross - net,
    }
}

/// Sum two split figures.
fn combine(a: SplitFigures, b: SplitFigures) -> Result<SplitFigures> {
    Ok(SplitFigures {
        gross: add(a.gross, b.gross)?,
        net: add(a.net, b.net)?,
        platform_cut: add(a.platform_cut, b.platform_cut)?,
    })
}

/// Partner shares in effect for one report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub partner_share: ShareRatio,
    pub pass_override: Option<ShareRatio>,
    pub block_override: Option<ShareRatio>,
    pub party_override: Option<ShareRatio>,
}

impl SplitConfig {
    pub fn uniform(partner_share: ShareRatio) -> Self {
        Self {
            partner_share,
            ..Self::default()
        }
    }

    pub fn ratio_for_sector(&self, sector: Sector) -> ShareRatio {
        let specific = match sector {
            Sector::Pass => self.pass_override,
            Sector::Block => self.block_override,
            Sector::Party => self.party_override,
        };
        specific.unwrap_or(self.partner_share)
    }

    /// Ratio for one category. Sector categories follow their sector;
    /// donations, direct sales and unattributed revenue use the default.
    pub fn ratio_for_category(&self, category: Category) -> ShareRatio {
        match category.sector() {
            Some(sector) => self.ratio_for_sector(sector),
            None => self.partner_share,
        }
    }
}

/// A revenue summary with splits applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetReport {
    /// Sorted by title.
    pub films: Vec<FilmRow>,
    /// Sorted by title.
    pub blocks: Vec<BlockRow>,
    pub sectors: SectorRows,
    pub totals: CategoryTotals,
    pub transaction_count: u64,
}

impl NetReport {
    /// Partner net across the platform: every film row plus the pass and
    /// block sectors. The party sector is already inside the film rows.
    pub fn partner_net_total(&self) -> Result<MinorUnits> {
        let films = self.films.iter().try_fold(0, |acc, row| add(acc, row.figures.net))?;
        add(add(films, self.sectors.pass.net)?, self.sectors.block.net)
    }

    /// Partner net of the films credited to `filmmaker` (exact match).
    pub fn partner_net_for(&self, filmmaker: &str) -> Result<MinorUnits> {
        self.films
            .iter()
            .filter(|row| row.filmmaker.as_deref() == Some(filmmaker))
            .try_fold(0, |acc, row| add(acc, row.figures.net))
    }
}

/// Apply splits to every row of a summary.
///
/// Film rows are split per category so each row conserves on its own.
/// `filmmakers` maps film title to payout recipient.
pub fn net_report(
    summary: &RevenueSummary,
    config: &SplitConfig,
    filmmakers: &HashMap<String, String>,
) -> Result<NetReport> {
    let mut films = Vec::with_capacity(summary.films.len());
    for (title, bucket) in &summary.films {
        let mut figures = SplitFigures::default();
        for (category, gross) in &bucket.gross_by_category {
            figures = combine(figures, split(*gross, config.ratio_for_category(*category)))?;
        }
        films.push(FilmRow {
            title: title.clone(),
            filmmaker: filmmakers.get(title).cloned(),
            gross_by_category: bucket.gross_by_category.clone(),
            figures,
        });
    }

    let block_ratio = config.ratio_for_sector(Sector::Block);
    let mut blocks = Vec::with_capacity(summary.blocks.len());
    for (title, bucket) in &summary.blocks {
        blocks.push(BlockRow {
            title: title.clone(),
            films: Vec::new(),
            figures: split(bucket.gross()?, block_ratio),
        });
    }

    let sector = |s: Sector| split(summary.sector(s), config.ratio_for_sector(s));
    let sectors = SectorRows {
        pass: sector(Sector::Pass),
        block: sector(Sector::Block),
        party: sector(Sector::Party),
    };

    tracing::debug!(
        films = films.len(),
        blocks = blocks.len(),
        partner_bps = config.partner_share.bps(),
        "splits applied"
    );

    Ok(NetReport {
        films,
        blocks,
        sectors,
        totals: summary.totals.clone(),
        transaction_count: summary.transaction_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use marquee_types::ClassifiedTransaction;

    fn tx(category: Category, key: Option<&str>, amount: MinorUnits) -> ClassifiedTransaction {
        ClassifiedTransaction {
            category,
            entity_key: key.map(str::to_string),
            amount,
        }
    }

    #[test]
    fn test_default_ratio() {
        assert_eq!(ShareRatio::DEFAULT.bps(), 7000);
        assert_eq!(ShareRatio::default(), ShareRatio::DEFAULT);
    }

    #[test]
    fn test_split_nightfall_donation() {
        let figures = split(500, ShareRatio::DEFAULT);
        assert_eq!(figures.net, 350);
        assert_eq!(figures.platform_cut, 150);
    }

    #[test]
    fn test_net_truncates_toward_zero() {
        // 70% of 333 is 233.1
        let figures = split(333, ShareRatio::DEFAULT);
        assert_eq!(figures.net, 233);
        assert_eq!(figures.platform_cut, 100);
        assert_eq!(split(1, ShareRatio::DEFAULT).net, 0);
    }

    #[test]
    fn test_split_conserves() {
        let ratios = [0, 1, 3333, 5000, 6999, 7000, 9999, 10_000];
        let amounts = [0, 1, 2, 7, 99, 100, 333, 12_345, 999_999_937, u64::MAX];
        for bps in ratios {
            let ratio = ShareRatio::from_bps(bps).expect("valid ratio");
            for gross in amounts {
                let f = split(gross, ratio);
                assert_eq!(f.net + f.platform_cut, gross, "gross {gross} bps {bps}");
                assert!(f.net <= gross);
            }
        }
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(ShareRatio::from_bps(10_000).is_ok());
        assert!(matches!(
            ShareRatio::from_bps(10_001),
            Err(RevenueError::InvalidRatio { bps: 10_001 })
        ));
        assert!(ShareRatio::from_bps(70_000).is_err());
    }

    #[test]
    fn test_sector_overrides() {
        let config = SplitConfig {
            block_override: Some(ShareRatio::from_bps(5000).expect("ratio")),
            ..SplitConfig::default()
        };
        assert_eq!(config.ratio_for_sector(Sector::Block).bps(), 5000);
        assert_eq!(config.ratio_for_sector(Sector::Pass).bps(), 7000);
        assert_eq!(config.ratio_for_category(Category::Block).bps(), 5000);
        assert_eq!(config.ratio_for_category(Category::Donation).bps(), 7000);
        assert_eq!(config.ratio_for_category(Category::Movie).bps(), 7000);
    }

    #[test]
    fn test_net_report_rows_conserve() {
        let summary = aggregate(&[
            tx(Category::Donation, Some("Nightfall"), 333),
            tx(Category::Ticket, Some("Nightfall"), 501),
            tx(Category::Movie, Some("Harbor"), 399),
            tx(Category::Block, Some("Indie Block"), 1001),
            tx(Category::FestivalPass, None, 2500),
        ])
        .expect("aggregate");
        let config = SplitConfig {
            party_override: Some(ShareRatio::from_bps(8000).expect("ratio")),
            ..SplitConfig::default()
        };
        let filmmakers = HashMap::from([("Nightfall".to_string(), "Ada Reyes".to_string())]);

        let report = net_report(&summary, &config, &filmmakers).expect("net report");
        for row in &report.films {
            assert_eq!(row.figures.net + row.figures.platform_cut, row.figures.gross);
        }
        let nightfall = &report.films[1];
        assert_eq!(nightfall.title, "Nightfall");
        assert_eq!(nightfall.filmmaker.as_deref(), Some("Ada Reyes"));
        assert_eq!(nightfall.figures.gross, 834);
        // 333 * 0.7 = 233, 501 * 0.8 = 400
        assert_eq!(nightfall.figures.net, 633);
        assert_eq!(report.films[0].filmmaker, None);

        assert_eq!(report.blocks[0].figures.gross, 1001);
        assert_eq!(report.sectors.party.net, 400);
        assert_eq!(report.sectors.pass.net, 1750);
    }

    #[test]
    fn test_partner_net_totals() {
        let summary = aggregate(&[
            tx(Category::Donation, Some("Nightfall"), 500),
            tx(Category::Ticket, Some("Echoes"), 500),
            tx(Category::Block, Some("Indie Block"), 1000),
        ])
        .expect("aggregate");
        let filmmakers = HashMap::from([
            ("Nightfall".to_string(), "Ada Reyes".to_string()),
            ("Echoes".to_string(), "Sam Ito".to_string()),
        ]);
        let report = net_report(&summary, &SplitConfig::default(), &filmmakers).expect("report");

        assert_eq!(report.partner_net_for("Ada Reyes").expect("net"), 350);
        assert_eq!(report.partner_net_for("ada reyes").expect("net"), 0);
        // Films 350 + 350, block sector 700; party is counted in the film rows.
        assert_eq!(report.partner_net_total().expect("total"), 1400);
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn split_conserves_gross(gross in any::<u64>(), bps in 0u32..=10_000) {
            let ratio = ShareRatio::from_bps(bps).expect("ratio in range");
            let figures = split(gross, ratio);
            prop_assert_eq!(figures.gross, gross);
            prop_assert!(figures.net <= gross);
            prop_assert_eq!(figures.net + figures.platform_cut, gross);
        }

        #[test]
        fn split_net_grows_with_ratio(gross in any::<u64>(), a in 0u32..=10_000, b in 0u32..=10_000) {
            let (low, high) = (a.min(b), a.max(b));
            let low = split(gross, ShareRatio::from_bps(low).expect("ratio in range"));
            let high = split(gross, ShareRatio::from_bps(high).expect("ratio in range"));
            prop_assert!(low.net <= high.net);
        }

        #[test]
        fn out_of_range_ratio_rejected(bps in 10_001u32..) {
            prop_assert!(ShareRatio::from_bps(bps).is_err());
        }
    }
}
