//! The `FactorLibrary` engine: cached queries, panel preparation, sorting,
//! aggregation, factor assembly, and reporting, wired end to end.

use crate::config::LibraryConfig;
use crate::error::{HanoverError, Result};
use crate::labels::widen_portfolios;
use chrono::{Months, NaiveDate};
use hanover_data::cache::{QueryCache, ResultCache};
use hanover_data::warehouse::{DateRange, TableQuery, Warehouse};
use hanover_data::{DataError, Frequency};
use hanover_factors::long_short::{SizeLeg, smb_from_sixths, spread_from_sixths};
use hanover_factors::market::market_excess_return;
use hanover_factors::registry::FactorName;
use hanover_output::stats::{SummaryTable, TableKind, summarize};
use hanover_output::compare::{ComparisonReport, compare_series};
use hanover_panel::characteristics::annual::{annual_fundamentals, june_formation_frame};
use hanover_panel::characteristics::prior::with_prior_return;
use hanover_panel::delist::adjust_for_delistings;
use hanover_panel::link::link_fundamentals;
use hanover_panel::returns::{compound_to, stamp_formation_year, with_lagged_me};
use hanover_panel::universe::{filter_universe, with_market_equity};
use hanover_panel::Characteristic;
use hanover_sorts::breakpoints::{BreakpointUniverse, even_grid, nyse_breakpoints};
use hanover_sorts::assign::assign_buckets;
use hanover_sorts::portfolio::{
    Weighting, aggregate_characteristics, aggregate_returns, join_assignments,
};
use polars::prelude::*;
use std::collections::HashMap;

/// Tercile grid of the published 2x3 factor sorts.
const FACTOR_TERCILES: [f64; 2] = [0.3, 0.7];

/// Days from the common-era epoch to 1970-01-01, the Date dtype's zero.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// A calendar date as a Date-typed literal expression.
fn date_lit(date: NaiveDate) -> Expr {
    use chrono::Datelike;
    lit(date.num_days_from_ce() - UNIX_EPOCH_CE_DAYS).cast(DataType::Date)
}

/// The pipeline engine.
///
/// Owns the warehouse seam and both cache layers; every public operation
/// takes the requested sample window and produces a presentation-ready
/// frame or report.
#[derive(Debug)]
pub struct FactorLibrary<W: Warehouse> {
    warehouse: W,
    config: LibraryConfig,
    store: Option<QueryCache>,
    memo: ResultCache,
}

impl<W: Warehouse> FactorLibrary<W> {
    /// Create an engine over a warehouse with the given configuration.
    pub fn new(warehouse: W, config: LibraryConfig) -> Result<Self> {
        config.validate()?;
        let store = match &config.cache_path {
            Some(path) => Some(QueryCache::open(path).map_err(HanoverError::Data)?),
            None => None,
        };
        let memo = ResultCache::with_capacity(config.memo_capacity);
        Ok(Self {
            warehouse,
            config,
            store,
            memo,
        })
    }

    /// The engine configuration.
    pub const fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Fetch a query result through the memo and the persistent cache.
    ///
    /// With `run_query` disabled, a result absent from both cache layers is
    /// an error rather than a warehouse round trip.
    pub async fn fetch(&mut self, query: &TableQuery) -> Result<DataFrame> {
        let key = query.cache_key();
        if let Some(frame) = self.memo.get(&key) {
            return Ok(frame);
        }
        if let Some(store) = &self.store {
            if let Some(frame) = store.get(&key).map_err(HanoverError::Data)? {
                self.memo.put(&key, frame.clone());
                return Ok(frame);
            }
        }
        if !self.config.run_query {
            return Err(HanoverError::Data(DataError::CacheMiss { key }));
        }
        let frame = self.warehouse.fetch(query).await.map_err(HanoverError::Data)?;
        if let Some(store) = &self.store {
            store.put(&key, &frame).map_err(HanoverError::Data)?;
        }
        self.memo.put(&key, frame.clone());
        Ok(frame)
    }

    /// The requested window widened backwards by the configured lookback.
    fn extended_range(&self, range: DateRange) -> DateRange {
        let months = self.config.lookback_months();
        let start = range
            .start
            .checked_sub_months(Months::new(months))
            .unwrap_or(range.start);
        DateRange {
            start,
            end: range.end,
        }
    }

    /// Prepared security panel at the native source frequency over the
    /// extended window: universe-filtered, market equity, delisting
    /// adjusted, lagged weights.
    async fn source_panel(&mut self, range: DateRange) -> Result<DataFrame> {
        let extended = self.extended_range(range);
        let source = self.config.frequency.source();
        let master = self
            .fetch(&TableQuery::SecurityMaster {
                range: extended,
                frequency: source,
            })
            .await?;
        let delistings = self
            .fetch(&TableQuery::Delistings { range: extended })
            .await?;

        let prepared = with_lagged_me(adjust_for_delistings(
            with_market_equity(filter_universe(master.lazy())),
            delistings.lazy(),
        ));
        Ok(prepared.collect()?)
    }

    /// Monthly panel used for June formations (queried separately when the
    /// source frequency is daily).
    async fn monthly_panel(&mut self, range: DateRange) -> Result<DataFrame> {
        if self.config.frequency.source() == Frequency::Monthly {
            return self.source_panel(range).await;
        }
        let extended = self.extended_range(range);
        let master = self
            .fetch(&TableQuery::SecurityMaster {
                range: extended,
                frequency: Frequency::Monthly,
            })
            .await?;
        let delistings = self
            .fetch(&TableQuery::Delistings { range: extended })
            .await?;
        let prepared = with_lagged_me(adjust_for_delistings(
            with_market_equity(filter_universe(master.lazy())),
            delistings.lazy(),
        ));
        Ok(prepared.collect()?)
    }

    /// One row per (security, formation year) with every annual sort value.
    async fn formation_frame(&mut self, range: DateRange) -> Result<DataFrame> {
        let extended = self.extended_range(range);
        let monthly = self.monthly_panel(range).await?;
        let fundamentals = self
            .fetch(&TableQuery::Fundamentals {
                range: DateRange {
                    // Investment and accruals need the preceding report too.
                    start: extended
                        .start
                        .checked_sub_months(Months::new(24))
                        .unwrap_or(extended.start),
                    end: extended.end,
                },
            })
            .await?;
        let links = self.fetch(&TableQuery::LinkTable).await?;

        let linked = link_fundamentals(fundamentals.lazy(), links.lazy());
        let annual = annual_fundamentals(linked)?;
        Ok(june_formation_frame(monthly.lazy(), annual)?.collect()?)
    }

    /// Sort the native panel into a long (date, bucket.., ret, n_firms)
    /// frame at the native source frequency.
    async fn sorted_long(
        &mut self,
        range: DateRange,
        dims: &[usize],
        weighting: Weighting,
    ) -> Result<(DataFrame, Vec<String>)> {
        let characteristics = self.config.sort_characteristics.clone();
        if dims.len() != characteristics.len() || dims.is_empty() {
            return Err(HanoverError::DimensionMismatch {
                dims: dims.to_vec(),
                characteristics: characteristics.len(),
            });
        }

        let bucket_cols: Vec<String> = (1..=dims.len()).map(|i| format!("bucket_{i}")).collect();

        let assigned = if self.config.per_period_formation() {
            self.assign_per_period(range, &characteristics, dims, &bucket_cols)
                .await?
        } else {
            self.assign_annual(range, &characteristics, dims, &bucket_cols)
                .await?
        };

        let bucket_refs: Vec<&str> = bucket_cols.iter().map(String::as_str).collect();
        let long = aggregate_returns(assigned.lazy(), "date", &bucket_refs, "me_lag", weighting)?
            .collect()?;
        Ok((long, bucket_cols))
    }

    /// Annual cadence: breakpoints and buckets from the June formation
    /// frame, held July through June on the return panel.
    async fn assign_annual(
        &mut self,
        range: DateRange,
        characteristics: &[Characteristic],
        dims: &[usize],
        bucket_cols: &[String],
    ) -> Result<DataFrame> {
        let formation = self.formation_frame(range).await?;
        let mut assigned = formation.lazy();
        for ((characteristic, &n), bucket_col) in
            characteristics.iter().zip(dims).zip(bucket_cols)
        {
            let value_col = characteristic.column();
            let breaks = nyse_breakpoints(
                assigned.clone(),
                &value_col,
                "form_year",
                &even_grid(n)?,
                BreakpointUniverse::Nyse,
            )?;
            assigned = assign_buckets(assigned, breaks, &value_col, "form_year", n, bucket_col)?;
        }

        let mut select: Vec<Expr> = vec![col("permno"), col("form_year")];
        select.extend(bucket_cols.iter().map(|b| col(b.as_str())));
        let assignments = assigned.select(select);

        let panel = self.source_panel(range).await?;
        let bucket_refs: Vec<&str> = bucket_cols.iter().map(String::as_str).collect();
        let joined = join_assignments(
            stamp_formation_year(panel.lazy()),
            assignments,
            &["permno", "form_year"],
            &bucket_refs,
        );
        Ok(joined.collect()?)
    }

    /// Per-period cadence: size uses the lagged market equity, prior-return
    /// strategies their trailing windows; breakpoints re-form every date.
    async fn assign_per_period(
        &mut self,
        range: DateRange,
        characteristics: &[Characteristic],
        dims: &[usize],
        bucket_cols: &[String],
    ) -> Result<DataFrame> {
        let source = self.config.frequency.source();
        let panel = self.source_panel(range).await?;

        let mut enriched = panel.lazy();
        for characteristic in characteristics {
            if let Characteristic::Prior { .. } = characteristic {
                enriched = with_prior_return(enriched, source, *characteristic)?;
            }
        }

        for ((characteristic, &n), bucket_col) in
            characteristics.iter().zip(dims).zip(bucket_cols)
        {
            let value_col = match characteristic {
                Characteristic::Me => "me_lag".to_string(),
                other => other.column(),
            };
            let breaks = nyse_breakpoints(
                enriched.clone(),
                &value_col,
                "date",
                &even_grid(n)?,
                BreakpointUniverse::Nyse,
            )?;
            enriched = assign_buckets(enriched, breaks, &value_col, "date", n, bucket_col)?;
        }
        Ok(enriched.collect()?)
    }

    /// Compound a long bucket frame to the configured frequency and trim to
    /// the requested window.
    fn finish_long(
        &self,
        long: DataFrame,
        bucket_cols: &[String],
        range: DateRange,
    ) -> Result<DataFrame> {
        let frequency = self.config.frequency;
        let bucket_refs: Vec<&str> = bucket_cols.iter().map(String::as_str).collect();
        let lazy = if frequency == frequency.source() {
            long.lazy()
        } else {
            compound_to(long.lazy(), frequency, &bucket_refs, &["ret"], &["n_firms"])?
        };
        Ok(lazy
            .filter(
                col("date")
                    .gt_eq(date_lit(range.start))
                    .and(col("date").lt_eq(date_lit(range.end))),
            )
            .collect()?)
    }

    /// Portfolio returns for the configured sort, one named column per
    /// portfolio.
    pub async fn portfolio_returns(
        &mut self,
        range: DateRange,
        dims: &[usize],
        weighting: Weighting,
    ) -> Result<DataFrame> {
        let (long, bucket_cols) = self.sorted_long(range, dims, weighting).await?;
        let trimmed = self.finish_long(long, &bucket_cols, range)?;
        let spec = self.dim_spec(dims);
        let bucket_refs: Vec<&str> = bucket_cols.iter().map(String::as_str).collect();
        widen_portfolios(&trimmed, &spec, &bucket_refs, "ret")
    }

    /// Number of firms per portfolio per period.
    pub async fn num_firms(&mut self, range: DateRange, dims: &[usize]) -> Result<DataFrame> {
        let (long, bucket_cols) = self.sorted_long(range, dims, Weighting::Value).await?;
        let trimmed = self.finish_long(long, &bucket_cols, range)?;
        let spec = self.dim_spec(dims);
        let bucket_refs: Vec<&str> = bucket_cols.iter().map(String::as_str).collect();
        widen_portfolios(&trimmed, &spec, &bucket_refs, "n_firms")
    }

    /// Average portfolio characteristics per formation:
    /// one wide frame per requested characteristic.
    pub async fn portfolio_characteristics(
        &mut self,
        range: DateRange,
        dims: &[usize],
    ) -> Result<Vec<(Characteristic, DataFrame)>> {
        let characteristics = self.config.sort_characteristics.clone();
        if dims.len() != characteristics.len() || dims.is_empty() {
            return Err(HanoverError::DimensionMismatch {
                dims: dims.to_vec(),
                characteristics: characteristics.len(),
            });
        }
        let requested = self.config.portfolio_characteristics.clone();
        if requested.is_empty() {
            return Err(HanoverError::Config(
                "no portfolio characteristics configured".to_string(),
            ));
        }

        let per_period = self.config.per_period_formation();
        let bucket_cols: Vec<String> = (1..=dims.len()).map(|i| format!("bucket_{i}")).collect();
        let spec = self.dim_spec(dims);
        let bucket_refs: Vec<&str> = bucket_cols.iter().map(String::as_str).collect();

        let (frame, date_col, weight_col) = if per_period {
            let assigned = self
                .assign_per_period(range, &characteristics, dims, &bucket_cols)
                .await?;
            (assigned, "date", "me_lag")
        } else {
            let formation = self.formation_frame(range).await?;
            let mut assigned = formation.lazy();
            for ((characteristic, &n), bucket_col) in
                characteristics.iter().zip(dims).zip(&bucket_cols)
            {
                let value_col = characteristic.column();
                let breaks = nyse_breakpoints(
                    assigned.clone(),
                    &value_col,
                    "form_year",
                    &even_grid(n)?,
                    BreakpointUniverse::Nyse,
                )?;
                assigned =
                    assign_buckets(assigned, breaks, &value_col, "form_year", n, bucket_col)?;
            }
            (assigned.collect()?, "form_year", "me")
        };

        let mut out = Vec::with_capacity(requested.len());
        for characteristic in requested {
            let column = if per_period && characteristic == Characteristic::Me {
                "me_lag".to_string()
            } else {
                characteristic.column()
            };
            if frame.column(&column).is_err() {
                return Err(HanoverError::Config(format!(
                    "characteristic {characteristic} is not available under this sort cadence"
                )));
            }
            let long = aggregate_characteristics(
                frame.clone().lazy(),
                date_col,
                &bucket_refs,
                weight_col,
                &[column.as_str()],
                Weighting::Value,
            )?
            .collect()?;
            let trimmed = if per_period {
                long.lazy().filter(
                    col("date")
                        .gt_eq(date_lit(range.start))
                        .and(col("date").lt_eq(date_lit(range.end))),
                )
            } else {
                use chrono::Datelike;
                long.lazy().filter(
                    col("form_year")
                        .gt_eq(lit(i64::from(range.start.year())))
                        .and(col("form_year").lt_eq(lit(i64::from(range.end.year())))),
                )
            };
            let renamed = trimmed
                .select([
                    col(date_col).alias("date"),
                    col("*").exclude([date_col]),
                ])
                .collect()?;
            let wide = widen_portfolios(&renamed, &spec, &bucket_refs, &column)?;
            out.push((characteristic, wide));
        }
        Ok(out)
    }

    /// Construct the configured factor series: a wide
    /// frame with one column per factor label.
    pub async fn factor_returns(&mut self, range: DateRange) -> Result<DataFrame> {
        let factors = self.config.factors.clone();
        if factors.is_empty() {
            return Err(HanoverError::Config("no factors configured".to_string()));
        }
        let frequency = self.config.frequency;
        let native = frequency == frequency.source();
        let five_factor_smb = factors
            .iter()
            .any(|f| matches!(f, FactorName::Rmw | FactorName::Cma));

        let mut sixths_cache: HashMap<Characteristic, DataFrame> = HashMap::new();
        let mut frames: Vec<DataFrame> = Vec::new();

        for factor in &factors {
            let frame = match factor {
                FactorName::MktRf => {
                    let panel = self.source_panel(range).await?;
                    let rf = self
                        .fetch(&TableQuery::RiskFree {
                            range: self.extended_range(range),
                            frequency: frequency.source(),
                        })
                        .await?;
                    let market = market_excess_return(panel.lazy(), rf.lazy())?.collect()?;
                    if native {
                        market
                    } else {
                        compound_to(market.lazy(), frequency, &[], &["MKT", "RF"], &[])?
                            .with_columns([(col("MKT") - col("RF")).alias("MKT-RF")])
                            .collect()?
                    }
                }
                FactorName::Smb => {
                    if five_factor_smb {
                        let mut legs: Vec<DataFrame> = Vec::new();
                        for (i, c) in [Characteristic::Bm, Characteristic::Op, Characteristic::Inv]
                            .into_iter()
                            .enumerate()
                        {
                            let sixths = self.sixths(range, c, &mut sixths_cache).await?;
                            legs.push(
                                smb_from_sixths(sixths.lazy(), &format!("smb_{i}"))?.collect()?,
                            );
                        }
                        let mut joined = legs.remove(0).lazy();
                        for leg in legs {
                            joined = joined.join(
                                leg.lazy(),
                                [col("date")],
                                [col("date")],
                                JoinArgs::new(JoinType::Left),
                            );
                        }
                        joined
                            .with_columns([((col("smb_0") + col("smb_1") + col("smb_2"))
                                / lit(3.0))
                            .alias("SMB")])
                            .select([col("date"), col("SMB")])
                            .collect()?
                    } else {
                        let sixths = self
                            .sixths(range, Characteristic::Bm, &mut sixths_cache)
                            .await?;
                        smb_from_sixths(sixths.lazy(), "SMB")?.collect()?
                    }
                }
                sort_factor => {
                    let characteristic = sort_factor.sort_characteristic().ok_or_else(|| {
                        HanoverError::Config(format!("{sort_factor} has no sort"))
                    })?;
                    let leg = sort_factor.long_leg().unwrap_or(SizeLeg::High);
                    let sixths = self.sixths(range, characteristic, &mut sixths_cache).await?;
                    spread_from_sixths(sixths.lazy(), leg, sort_factor.label())?.collect()?
                }
            };
            frames.push(frame);
        }

        // Date spine: the union of every factor's dates.
        let mut date_frames: Vec<LazyFrame> = Vec::with_capacity(frames.len());
        for frame in &frames {
            date_frames.push(frame.clone().lazy().select([col("date")]));
        }
        let spine = concat(date_frames, UnionArgs::default())?
            .group_by([col("date")])
            .agg([len().alias("_n")])
            .select([col("date")])
            .sort(["date"], Default::default());

        let mut joined = spine;
        for frame in frames {
            joined = joined.join(
                frame.lazy(),
                [col("date")],
                [col("date")],
                JoinArgs::new(JoinType::Left),
            );
        }

        let mut select: Vec<Expr> = vec![col("date")];
        select.extend(factors.iter().map(|f| col(f.label())));
        Ok(joined
            .select(select)
            .filter(
                col("date")
                    .gt_eq(date_lit(range.start))
                    .and(col("date").lt_eq(date_lit(range.end))),
            )
            .sort(["date"], Default::default())
            .collect()?)
    }

    /// The six value-weighted portfolios of the 2x3 size-by-characteristic
    /// sort, at the configured frequency.
    async fn sixths(
        &mut self,
        range: DateRange,
        characteristic: Characteristic,
        cache: &mut HashMap<Characteristic, DataFrame>,
    ) -> Result<DataFrame> {
        if let Some(frame) = cache.get(&characteristic) {
            return Ok(frame.clone());
        }

        let assigned = if characteristic.is_annual() {
            let formation = self.formation_frame(range).await?;
            let me_breaks = nyse_breakpoints(
                formation.clone().lazy(),
                "me",
                "form_year",
                &[0.5],
                BreakpointUniverse::Nyse,
            )?;
            let with_size = assign_buckets(
                formation.lazy(),
                me_breaks,
                "me",
                "form_year",
                2,
                "size_bucket",
            )?;
            let value_col = characteristic.column();
            let sort_breaks = nyse_breakpoints(
                with_size.clone(),
                &value_col,
                "form_year",
                &FACTOR_TERCILES,
                BreakpointUniverse::Nyse,
            )?;
            let assigned = assign_buckets(
                with_size,
                sort_breaks,
                &value_col,
                "form_year",
                3,
                "sort_bucket",
            )?;
            let assignments =
                assigned.select([col("permno"), col("form_year"), col("size_bucket"), col("sort_bucket")]);

            let panel = self.source_panel(range).await?;
            join_assignments(
                stamp_formation_year(panel.lazy()),
                assignments,
                &["permno", "form_year"],
                &["size_bucket", "sort_bucket"],
            )
            .collect()?
        } else {
            let source = self.config.frequency.source();
            let panel = self.source_panel(range).await?;
            let enriched = with_prior_return(panel.lazy(), source, characteristic)?;
            let me_breaks = nyse_breakpoints(
                enriched.clone(),
                "me_lag",
                "date",
                &[0.5],
                BreakpointUniverse::Nyse,
            )?;
            let with_size =
                assign_buckets(enriched, me_breaks, "me_lag", "date", 2, "size_bucket")?;
            let value_col = characteristic.column();
            let sort_breaks = nyse_breakpoints(
                with_size.clone(),
                &value_col,
                "date",
                &FACTOR_TERCILES,
                BreakpointUniverse::Nyse,
            )?;
            assign_buckets(with_size, sort_breaks, &value_col, "date", 3, "sort_bucket")?
                .collect()?
        };

        let long = aggregate_returns(
            assigned.lazy(),
            "date",
            &["size_bucket", "sort_bucket"],
            "me_lag",
            Weighting::Value,
        )?
        .collect()?;

        let frequency = self.config.frequency;
        let finished = if frequency == frequency.source() {
            long
        } else {
            compound_to(
                long.lazy(),
                frequency,
                &["size_bucket", "sort_bucket"],
                &["ret"],
                &["n_firms"],
            )?
            .collect()?
        };

        cache.insert(characteristic, finished.clone());
        Ok(finished)
    }

    /// Summary statistics of a constructed table.
    pub fn summary(&self, frame: &DataFrame, kind: TableKind) -> Result<SummaryTable> {
        Ok(summarize(
            frame,
            kind,
            self.config.frequency.code(),
            &[],
        )?)
    }

    /// Compare a constructed table against a published reference table
    /// over their overlapping sample.
    pub fn compare(
        &self,
        constructed: &DataFrame,
        reference: &DataFrame,
    ) -> Result<ComparisonReport> {
        Ok(compare_series(constructed, reference)?)
    }

    fn dim_spec(&self, dims: &[usize]) -> Vec<(Characteristic, usize)> {
        self.config
            .sort_characteristics
            .iter()
            .copied()
            .zip(dims.iter().copied())
            .collect()
    }
}

/// Convenience constructor for a range, rejecting inverted windows.
pub fn sample_range(start: NaiveDate, end: NaiveDate) -> Result<DateRange> {
    DateRange::new(start, end).map_err(HanoverError::Data)
}
