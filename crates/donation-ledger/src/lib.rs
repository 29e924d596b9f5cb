//! `donation-ledger` - Campaign donations ledger and query service
//!
//! Each donation a donor makes may be split across several campaigns; every
//! share is one ledger row. This library stores those rows in SQLite and
//! answers totals, donor counts, itemized listings and reports over them,
//! filtered by donation status.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod currency;
pub mod donors;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod posts;
pub mod status;
pub mod storage;
pub mod table;

pub use cache::{DonationsCache, NullCache};
pub use config::Config;
pub use currency::{Amount, Currency, CurrencyNormalizer, DecimalSeparator};
pub use error::{Error, Result};
pub use ledger::{
    CampaignDonation, CampaignDonationChanges, CampaignDonations, CampaignShare, IdList, Ledger,
    LedgerStats, NewCampaignDonation, NewDonation, Period, ReportQuery,
};
pub use logging::init_logging;
pub use status::{DonationStatuses, StatusPolicy};
pub use storage::Database;
pub use table::Table;
