//! `dledger` - CLI for donation-ledger
//!
//! This binary provides the command-line interface for recording donations
//! and querying the campaign donations ledger.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use chrono::{Local, NaiveDateTime};
use clap::Parser;
use tracing::debug;

use donation_ledger::cli::{
    CampaignCommand, Cli, Command, ConfigCommand, DonationCommand, DonorCommand, OutputFormat,
    RecordCommand, ReportCommand,
};
use donation_ledger::donors::NewDonor;
use donation_ledger::ledger::ReportRow;
use donation_ledger::storage::migrations;
use donation_ledger::{
    init_logging, CampaignDonation, CampaignDonationChanges, Config, Error, IdList, Ledger,
    NewCampaignDonation, NewDonation, Period, ReportQuery, Table,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() -> CliResult {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        Command::Init => handle_init(&config),
        command => {
            let ledger = Ledger::open(&config)?;
            debug!("Opened ledger at {}", ledger.database().path().display());
            run(&ledger, command)
        }
    }
}

fn run(ledger: &Ledger, command: Command) -> CliResult {
    match command {
        Command::Status(cmd) => handle_status(ledger, cmd.json),
        Command::Campaign(cmd) => handle_campaign(ledger, cmd),
        Command::Donation(cmd) => handle_donation(ledger, cmd),
        Command::Donor(cmd) => handle_donor(ledger, cmd),
        Command::Record(cmd) => handle_record(ledger, cmd),
        Command::Total(cmd) => {
            let total = ledger.campaign_donations().total(&cmd.statuses)?;
            println!("{total}");
            Ok(())
        }
        Command::Report(cmd) => handle_report(ledger, &cmd),
        Command::Summary(cmd) => {
            let period = Period::parse(&cmd.period)?;
            let summary = ledger
                .campaign_donations()
                .summary_by_period(&period, &cmd.statuses)?;
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Period:     {period}");
                println!("Donations:  {}", summary.count);
                println!("Amount:     {}", summary.amount);
            }
            Ok(())
        }
        Command::Init | Command::Config(_) => Ok(()),
    }
}

fn handle_init(config: &Config) -> CliResult {
    let ledger = Ledger::open(config)?;
    let version = migrations::schema_version(ledger.database().connection())?;
    println!(
        "Ledger ready at {} (schema version {version})",
        ledger.database().path().display()
    );
    Ok(())
}

fn handle_status(ledger: &Ledger, json: bool) -> CliResult {
    let stats = ledger.stats()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        let date = |d: Option<NaiveDateTime>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        println!("dledger status");
        println!("--------------");
        println!("Database:      {}", ledger.database().path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Campaigns:     {}", stats.campaigns);
        println!("Donations:     {}", stats.donations);
        println!("Donors:        {}", stats.donors);
        println!("Ledger rows:   {}", stats.ledger_rows);
        println!("Oldest:        {}", date(stats.oldest_donation));
        println!("Newest:        {}", date(stats.newest_donation));
    }
    Ok(())
}

fn handle_campaign(ledger: &Ledger, cmd: CampaignCommand) -> CliResult {
    let donations = ledger.campaign_donations();
    match cmd {
        CampaignCommand::Add { title, date } => {
            let id = ledger.add_campaign(&title, date.unwrap_or_else(now))?;
            println!("{id}");
        }
        CampaignCommand::Total {
            campaigns,
            all,
            raw,
        } => {
            let amount = donations.campaign_donated_amount(IdList::parse(&campaigns), all, !raw)?;
            println!("{amount}");
        }
        CampaignCommand::Donors {
            campaigns,
            count,
            all,
        } => {
            let campaigns = IdList::parse(&campaigns);
            if count {
                println!("{}", donations.count_campaign_donors(campaigns, all)?);
            } else {
                print_ids(&donations.campaign_donors(campaigns)?);
            }
        }
        CampaignCommand::Donations {
            campaigns,
            ids,
            format,
        } => {
            let campaigns = IdList::parse(&campaigns);
            if ids {
                print_ids(&donations.donation_ids_for_campaign(campaigns)?);
            } else {
                print_records(&donations.donations_on_campaign(campaigns)?, format)?;
            }
        }
    }
    Ok(())
}

fn handle_donation(ledger: &Ledger, cmd: DonationCommand) -> CliResult {
    match cmd {
        DonationCommand::Add {
            donor,
            shares,
            status,
            date,
            note,
        } => {
            let id = ledger.add_donation(&NewDonation {
                donor_id: donor,
                status,
                date: date.unwrap_or_else(now),
                note,
                shares,
            })?;
            println!("{id}");
        }
        DonationCommand::Status { donation, status } => {
            ledger.set_donation_status(donation, &status)?;
            println!("Donation {donation} is now {status}");
        }
        DonationCommand::Delete { donation } => {
            let removed = ledger.delete_donation(donation)?;
            println!("Deleted donation {donation} ({removed} ledger rows)");
        }
        DonationCommand::Amount {
            donations,
            campaigns,
        } => {
            let campaigns = (!campaigns.is_empty()).then(|| IdList::parse(&campaigns));
            let amount = ledger
                .campaign_donations()
                .donation_amount(IdList::parse(&donations), campaigns)?;
            println!("{amount}");
        }
        DonationCommand::Show { donation, format } => {
            let records = ledger.campaign_donations().donation_records(donation)?;
            print_records(&records, format)?;
        }
    }
    Ok(())
}

fn handle_donor(ledger: &Ledger, cmd: DonorCommand) -> CliResult {
    let donations = ledger.campaign_donations();
    match cmd {
        DonorCommand::Add {
            email,
            first_name,
            last_name,
            user_id,
        } => {
            if let Some(existing) = ledger.donors().find_by_email(&email)? {
                println!("{}", existing.donor_id);
                return Ok(());
            }
            let id = ledger.donors().insert(&NewDonor {
                user_id,
                email,
                first_name,
                last_name,
                date_joined: now(),
            })?;
            println!("{id}");
        }
        DonorCommand::Donations {
            donor,
            distinct,
            format,
        } => {
            print_records(&donations.donations_by_donor(donor, distinct)?, format)?;
        }
        DonorCommand::Total { donor, json } => {
            let total = donations.total_donated_by_donor(donor)?;
            let count = donations.count_donations_by_donor(donor, true)?;
            let campaigns = donations.count_campaigns_supported_by_donor(donor)?;
            if json {
                let summary = serde_json::json!({
                    "donor_id": donor,
                    "total": total,
                    "donations": count,
                    "campaigns": campaigns,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Donor:      {donor}");
                println!("Total:      {total}");
                println!("Donations:  {count}");
                println!("Campaigns:  {campaigns}");
            }
        }
    }
    Ok(())
}

fn handle_record(ledger: &Ledger, cmd: RecordCommand) -> CliResult {
    let donations = ledger.campaign_donations();
    match cmd {
        RecordCommand::Add {
            donation,
            donor,
            campaign,
            amount,
            name,
        } => {
            let id = donations.insert(&NewCampaignDonation {
                donation_id: donation,
                donor_id: donor,
                campaign_id: campaign,
                campaign_name: name,
                amount: donation_ledger::currency::parse_amount(&amount)?,
            })?;
            println!("{id}");
        }
        RecordCommand::Update {
            id,
            donation,
            donor,
            campaign,
            amount,
            name,
        } => {
            let changes = CampaignDonationChanges {
                donation_id: donation,
                donor_id: donor,
                campaign_id: campaign,
                campaign_name: name,
                amount: amount
                    .as_deref()
                    .map(donation_ledger::currency::parse_amount)
                    .transpose()?,
            };
            if !donations.update(id, &changes)? {
                return Err(Error::not_found("ledger row", id).into());
            }
            println!("Updated ledger row {id}");
        }
        RecordCommand::Delete { id } => {
            if !donations.delete(id)? {
                return Err(Error::not_found("ledger row", id).into());
            }
            println!("Deleted ledger row {id}");
        }
    }
    Ok(())
}

fn handle_report(ledger: &Ledger, cmd: &ReportCommand) -> CliResult {
    let query = ReportQuery {
        campaigns: (!cmd.campaigns.is_empty()).then(|| IdList::parse(&cmd.campaigns)),
        status: cmd.status.clone(),
        start_date: cmd.since,
        end_date: cmd.until,
        order_by: cmd.orderby.map(Into::into),
        order: cmd.order.map(Into::into),
    };
    let rows = ledger.campaign_donations().donations_report(&query)?;
    print_report(&rows, cmd.format)
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Currency]");
                println!(
                    "  Decimal separator:  {}",
                    config.currency.decimal_separator
                );
                println!();
                println!("[Statuses]");
                println!("  Valid:              {}", config.statuses.valid.join(", "));
                println!(
                    "  Approval:           {}",
                    config.statuses.approval.join(", ")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn print_ids(ids: &[i64]) {
    for id in ids {
        println!("{id}");
    }
}

fn print_records(records: &[CampaignDonation], format: OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Plain => {
            for r in records {
                println!(
                    "{} donation={} donor={} campaign={} amount={} name={:?}",
                    r.campaign_donation_id,
                    r.donation_id,
                    r.donor_id,
                    r.campaign_id,
                    r.amount,
                    r.campaign_name
                );
            }
        }
        OutputFormat::Table => {
            println!(
                "{:>8}  {:>8}  {:>8}  {:>8}  {:>14}  CAMPAIGN NAME",
                "ID", "DONATION", "DONOR", "CAMPAIGN", "AMOUNT"
            );
            for r in records {
                println!(
                    "{:>8}  {:>8}  {:>8}  {:>8}  {:>14}  {}",
                    r.campaign_donation_id,
                    r.donation_id,
                    r.donor_id,
                    r.campaign_id,
                    r.amount.to_string(),
                    r.campaign_name
                );
            }
        }
    }
    Ok(())
}

fn print_report(rows: &[ReportRow], format: OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Plain => {
            for r in rows {
                println!(
                    "{} {} donation={} campaign={} amount={} status={} email={}",
                    r.post_date,
                    r.campaign_name,
                    r.donation_id,
                    r.campaign_id,
                    r.amount,
                    r.post_status,
                    r.email
                );
            }
        }
        OutputFormat::Table => {
            println!(
                "{:<19}  {:>8}  {:<24}  {:>14}  {:<22}  DONOR",
                "DATE", "DONATION", "CAMPAIGN", "AMOUNT", "STATUS"
            );
            for r in rows {
                println!(
                    "{:<19}  {:>8}  {:<24}  {:>14}  {:<22}  {} {} <{}>",
                    r.post_date.to_string(),
                    r.donation_id,
                    r.campaign_name,
                    r.amount.to_string(),
                    r.post_status,
                    r.first_name,
                    r.last_name,
                    r.email
                );
            }
        }
    }
    Ok(())
}
