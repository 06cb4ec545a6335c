//! Application of the security-to-fundamentals link table.
//!
//! Fundamentals are keyed by an accounting identifier (`gvkey`); returns are
//! keyed by the security identifier (`permno`). The link table relates the
//! two with validity windows and a primacy code. Each accounting row is
//! stamped with the security it belongs to as of its report date; where
//! links overlap, the primary link wins.

use polars::prelude::*;

/// Far-future sentinel for open-ended links.
const OPEN_LINK_END: &str = "9999-12-31";

/// Attach `permno` to a fundamentals frame through the link table.
///
/// `links` carries `gvkey`, `permno`, `linkprim`, `linkdt`, `linkenddt`
/// (null when the link is still open). A fundamentals row is linked when
/// its `datadate` falls inside the validity window. Overlapping links are
/// resolved by primacy (`P` over `C` over the rest), then by the lowest
/// security identifier for determinism.
pub fn link_fundamentals(fundamentals: LazyFrame, links: LazyFrame) -> LazyFrame {
    let links = links.with_columns([
        col("linkenddt")
            .fill_null(lit(OPEN_LINK_END).cast(DataType::Date))
            .alias("link_end"),
        when(col("linkprim").eq(lit("P")))
            .then(lit(0i32))
            .when(col("linkprim").eq(lit("C")))
            .then(lit(1i32))
            .otherwise(lit(2i32))
            .alias("link_rank"),
    ]);

    fundamentals
        .join(
            links.select([
                col("gvkey"),
                col("permno"),
                col("linkdt"),
                col("link_end"),
                col("link_rank"),
            ]),
            [col("gvkey")],
            [col("gvkey")],
            JoinArgs::new(JoinType::Inner),
        )
        .filter(
            col("datadate")
                .gt_eq(col("linkdt"))
                .and(col("datadate").lt_eq(col("link_end"))),
        )
        .filter(
            col("link_rank")
                .eq(col("link_rank")
                    .min()
                    .over([col("gvkey"), col("datadate")])),
        )
        .filter(
            col("permno").eq(col("permno")
                .min()
                .over([col("gvkey"), col("datadate")])),
        )
        .select([col("*").exclude(["linkdt", "link_end", "link_rank"])])
}
