//! Annual characteristics and the June formation frame.
//!
//! Accounting data for the fiscal year ending in calendar year `t - 1`
//! drives sorting from July of year `t` through June of `t + 1`. Formation
//! ties three snapshots together: June-of-`t` market equity (the size sort
//! value and issuance denominator), December-of-`t-1` market equity (the
//! valuation-ratio denominator), and the latest linked fiscal-year report.

use crate::error::Result;
use polars::prelude::*;
use std::f64::consts::E;

/// Derive book equity on a linked fundamentals frame.
///
/// `be = se + txditc - ps`, with stockholders' equity falling back from
/// `seq` to `ceq + pstk` to `at - lt`, and preferred stock falling back
/// from redemption to liquidating to carrying value.
pub fn with_book_equity(fundamentals: LazyFrame) -> LazyFrame {
    let se = when(col("seq").is_not_null())
        .then(col("seq"))
        .when(col("ceq").is_not_null())
        .then(col("ceq") + col("pstk").fill_null(0.0))
        .otherwise(col("at") - col("lt"))
        .alias("se");
    let ps = when(col("pstkrv").is_not_null())
        .then(col("pstkrv"))
        .when(col("pstkl").is_not_null())
        .then(col("pstkl"))
        .when(col("pstk").is_not_null())
        .then(col("pstk"))
        .otherwise(lit(0.0))
        .alias("ps");

    fundamentals
        .with_columns([se, ps])
        .with_columns([(col("se") + col("txditc").fill_null(0.0) - col("ps")).alias("be")])
        .select([col("*").exclude(["se", "ps"])])
}

/// Reduce a linked fundamentals frame to one row per (security, formation
/// year) carrying the annual accounting characteristics.
///
/// Output columns: `permno`, `form_year`, `be`, `op`, `inv`, `ac`, `ib`,
/// `cf`. A fiscal year ending in calendar `t` feeds the formation of June
/// `t + 1`; year-over-year quantities require the previous report to be the
/// immediately preceding fiscal year.
pub fn annual_fundamentals(linked: LazyFrame) -> Result<LazyFrame> {
    let prepared = with_book_equity(linked)
        .with_columns([col("datadate").dt().year().cast(DataType::Int64).alias("cal_year")])
        .sort(["permno", "datadate"], Default::default())
        .with_columns([
            col("at").shift(lit(1)).over([col("permno")]).alias("at_lag"),
            col("cal_year")
                .shift(lit(1))
                .over([col("permno")])
                .alias("cal_year_lag"),
            ((col("act") - col("che"))
                - (col("lct") - col("dlc").fill_null(0.0) - col("txp").fill_null(0.0)))
            .alias("wcap"),
        ])
        .with_columns([col("wcap")
            .shift(lit(1))
            .over([col("permno")])
            .alias("wcap_lag")])
        .with_columns([col("cal_year_lag")
            .eq(col("cal_year") - lit(1i64))
            .alias("consecutive")]);

    // Profitability needs revenue, a positive book, and at least one cost item.
    let has_cost = col("cogs")
        .is_not_null()
        .or(col("xsga").is_not_null())
        .or(col("xint").is_not_null());
    let op = when(
        col("revt")
            .is_not_null()
            .and(has_cost)
            .and(col("be").gt(0.0)),
    )
    .then(
        (col("revt")
            - col("cogs").fill_null(0.0)
            - col("xsga").fill_null(0.0)
            - col("xint").fill_null(0.0))
            / col("be"),
    )
    .otherwise(lit(NULL))
    .alias("op");

    let inv = when(col("consecutive").and(col("at_lag").gt(0.0)))
        .then((col("at") - col("at_lag")) / col("at_lag"))
        .otherwise(lit(NULL))
        .alias("inv");

    let ac = when(
        col("consecutive")
            .and(col("wcap").is_not_null())
            .and(col("wcap_lag").is_not_null())
            .and(col("be").gt(0.0)),
    )
    .then((col("wcap") - col("wcap_lag")) / col("be"))
    .otherwise(lit(NULL))
    .alias("ac");

    let cf = when(col("ib").is_not_null())
        .then(col("ib") + col("txditc").fill_null(0.0))
        .otherwise(lit(NULL))
        .alias("cf");

    Ok(prepared
        .with_columns([op, inv, ac, cf])
        .with_columns([(col("cal_year") + lit(1i64)).alias("form_year")])
        .select([
            col("permno"),
            col("form_year"),
            col("be"),
            col("op"),
            col("inv"),
            col("ac"),
            col("ib"),
            col("cf"),
        ]))
}

/// Build the June formation frame from a monthly panel and the annual
/// fundamentals.
///
/// The monthly panel must carry `permno`, `date`, `ret`, `retx`, `me`,
/// `me_lag`, `shrout`, `cfacshr`, `nyse`. One row per (security, formation
/// year) comes out, holding the sort values: `me` (June market equity),
/// `bm`, `op`, `inv`, `ep`, `cfp`, `dp`, `ac`, `ni`, plus the `nyse` flag
/// as of formation.
///
/// Valuation ratios use December-of-`t-1` market equity and require a
/// positive denominator; `bm` additionally requires positive book equity,
/// and `ep`/`cfp` follow the published convention of sorting only positive
/// values. Dividend yield accumulates twelve months of dividend dollars
/// (`(ret - retx) * me_lag`) through June and scales by June market equity.
/// Issuance compares split-adjusted June shares year over year.
pub fn june_formation_frame(
    monthly_panel: LazyFrame,
    fundamentals_annual: LazyFrame,
) -> Result<LazyFrame> {
    let with_derived = monthly_panel
        .sort(["permno", "date"], Default::default())
        .with_columns([
            ((col("ret").fill_null(0.0) - col("retx").fill_null(0.0)) * col("me_lag"))
                .alias("div_dollar"),
            (col("shrout") * col("cfacshr")).alias("shadj"),
            col("date").dt().month().cast(DataType::Int64).alias("month"),
            col("date").dt().year().cast(DataType::Int64).alias("year"),
        ])
        .with_columns([col("div_dollar")
            .rolling_sum(RollingOptionsFixedWindow {
                window_size: 12,
                min_periods: 12,
                ..Default::default()
            })
            .over([col("permno")])
            .alias("div_12m")]);

    let june = with_derived
        .clone()
        .filter(col("month").eq(lit(6i64)))
        .select([
            col("permno"),
            col("year").alias("form_year"),
            col("me"),
            col("nyse"),
            col("shadj"),
            col("div_12m"),
        ])
        .sort(["permno", "form_year"], Default::default())
        .with_columns([
            col("shadj")
                .shift(lit(1))
                .over([col("permno")])
                .alias("shadj_lag"),
            col("form_year")
                .shift(lit(1))
                .over([col("permno")])
                .alias("form_year_lag"),
        ]);

    let december = with_derived
        .filter(col("month").eq(lit(12i64)))
        .select([
            col("permno"),
            (col("year") + lit(1i64)).alias("form_year"),
            col("me").alias("me_dec"),
        ]);

    let joined = june
        .join(
            december,
            [col("permno"), col("form_year")],
            [col("permno"), col("form_year")],
            JoinArgs::new(JoinType::Left),
        )
        .join(
            fundamentals_annual,
            [col("permno"), col("form_year")],
            [col("permno"), col("form_year")],
            JoinArgs::new(JoinType::Left),
        );

    let bm = when(col("be").gt(0.0).and(col("me_dec").gt(0.0)))
        .then(col("be") / col("me_dec"))
        .otherwise(lit(NULL))
        .alias("bm");
    let ep = when(col("ib").gt(0.0).and(col("me_dec").gt(0.0)))
        .then(col("ib") / col("me_dec"))
        .otherwise(lit(NULL))
        .alias("ep");
    let cfp = when(col("cf").gt(0.0).and(col("me_dec").gt(0.0)))
        .then(col("cf") / col("me_dec"))
        .otherwise(lit(NULL))
        .alias("cfp");
    let dp = when(col("div_12m").gt(0.0).and(col("me").gt(0.0)))
        .then(col("div_12m") / col("me"))
        .otherwise(lit(NULL))
        .alias("dp");
    let ni = when(
        col("form_year_lag")
            .eq(col("form_year") - lit(1i64))
            .and(col("shadj").gt(0.0))
            .and(col("shadj_lag").gt(0.0)),
    )
    .then((col("shadj") / col("shadj_lag")).log(E))
    .otherwise(lit(NULL))
    .alias("ni");

    Ok(joined.with_columns([bm, ep, cfp, dp, ni]).select([
        col("permno"),
        col("form_year"),
        col("me"),
        col("nyse"),
        col("bm"),
        col("op"),
        col("inv"),
        col("ep"),
        col("cfp"),
        col("dp"),
        col("ac"),
        col("ni"),
    ]))
}
