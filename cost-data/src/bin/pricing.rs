use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;
use cost_core::calculations::RawManagerialParameters;
use cost_core::{
    IncentiveRequest, ManagerialParameters, PricingOrchestrator, PricingRequest, PricingResult,
    Regime, TaxTotals,
};
use cost_data::{DeclarationLoader, TomlConfigurationProvider, init_tracing};
use tracing::debug;

/// Price import declarations: landed-cost cascade, regime credits and,
/// optionally, a state ICMS incentive with its reform projection.
///
/// The declarations CSV has one row per addition with the columns
/// declaration, addition, ncm, customs_value, ii_due, ipi_due, pis_due,
/// cofins_due, icms_due and customs_expenses. Rows are grouped and summed
/// per declaration.
#[derive(Parser, Debug)]
#[command(name = "cost-pricing")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the pricing configuration TOML file
    #[arg(short, long, default_value = "pricing.toml")]
    config: PathBuf,

    /// Path to the declarations CSV file
    #[arg(short, long)]
    declarations: PathBuf,

    /// Tax regime: lucro_real, lucro_presumido or simples_nacional
    #[arg(short, long)]
    regime: Regime,

    /// Financial charges, percent of the disbursement cost
    #[arg(long)]
    financial_charges: String,

    /// Other recoverable taxes, absolute amount in BRL
    #[arg(long)]
    other_recoverable: String,

    /// Indirect costs, percent of the accounting cost
    #[arg(long)]
    indirect_costs: String,

    /// Operating margin, percent of the accounting cost
    #[arg(long)]
    margin: String,

    /// Destination state (UF) for the incentive program
    #[arg(long, requires = "program")]
    state: Option<String>,

    /// Incentive program code (e.g. TTD_409)
    #[arg(long, requires = "state")]
    program: Option<String>,

    /// Benefit phase index of the program
    #[arg(long, default_value_t = 0)]
    phase: usize,

    /// First year of the reform projection (defaults to the current year)
    #[arg(long)]
    reform_start: Option<i32>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    debug!("opening configuration {}", args.config.display());
    let provider = TomlConfigurationProvider::open(&args.config)
        .await
        .with_context(|| format!("Failed to open configuration: {}", args.config.display()))?;

    let orchestrator = PricingOrchestrator::from_provider(&provider)
        .await
        .context("Invalid pricing configuration")?;

    let params = ManagerialParameters::try_from(RawManagerialParameters {
        financial_charges_percent: Some(args.financial_charges.clone()),
        other_recoverable_taxes: Some(args.other_recoverable.clone()),
        indirect_costs_percent: Some(args.indirect_costs.clone()),
        operating_margin_percent: Some(args.margin.clone()),
    })
    .context("Invalid managerial parameters")?;

    let incentive = args
        .state
        .clone()
        .zip(args.program.clone())
        .map(|(state, program_code)| IncentiveRequest {
            state,
            program_code,
            phase_index: args.phase,
        });
    let reform_start = args
        .reform_start
        .unwrap_or_else(|| chrono::Local::now().year());

    println!("Loading declarations from: {}", args.declarations.display());

    let file = File::open(&args.declarations)
        .with_context(|| format!("Failed to open: {}", args.declarations.display()))?;
    let records = DeclarationLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.declarations.display()))?;

    println!("Parsed {} declarations from CSV", records.len());

    for record in records {
        let totals = TaxTotals::try_from(record.totals)
            .with_context(|| format!("Invalid totals for declaration {}", record.declaration))?;
        let request = PricingRequest {
            declaration: record.declaration,
            totals,
            regime: args.regime,
            params: params.clone(),
            incentive: incentive.clone(),
            reform_start_year: Some(reform_start),
        };

        let result = orchestrator
            .price_declaration(&request)
            .with_context(|| format!("Failed to price declaration {}", request.declaration))?;
        print_result(&result);
    }

    Ok(())
}

fn print_result(result: &PricingResult) {
    let cascade = &result.cascade;
    let credits = cascade.credits();

    println!();
    println!("Declaration {}", result.declaration);
    println!(
        "  Regime:            {} ({})",
        credits.regime.label(),
        credits.import_type
    );
    println!("  Base cost:         {:>14}", cascade.base_cost());
    println!("  Credits:           {:>14}", credits.total_credit);
    println!("  Disbursement cost: {:>14}", cascade.disbursement_cost());
    println!("  Accounting cost:   {:>14}", cascade.accounting_cost());
    println!("  Pricing base:      {:>14}", cascade.pricing_base());

    let Some(outcome) = &result.incentive else {
        return;
    };
    let eligibility = &outcome.eligibility;
    println!(
        "  Incentive {} ({}): {}",
        eligibility.program_code, eligibility.state, eligibility.reason
    );
    if !eligibility.restricted_ncms.is_empty() {
        println!("    Restricted NCMs: {}", eligibility.restricted_ncms.join(", "));
    }
    if !eligibility.alternative_programs.is_empty() {
        println!(
            "    Alternatives:    {}",
            eligibility.alternative_programs.join(", ")
        );
    }

    if let Some(fields) = &outcome.invoice_fields {
        println!("    CST {} / cBenef {}", fields.cst, fields.benefit_code);
        println!("    Calculation base: {:>14}", fields.calculation_base);
        println!(
            "    ICMS operation:   {:>14} ({}%)",
            fields.icms_operation_amount, fields.nominal_icms_rate
        );
        println!("    ICMS due:         {:>14}", fields.icms_due_amount);
        println!(
            "    ICMS deferred:    {:>14} ({}%)",
            fields.icms_deferred_amount, fields.deferral_percent
        );
    }

    for projected in &outcome.reform_projection {
        println!(
            "    {} {:<20} x{:<5} deferred {:>14}",
            projected.scenario.year,
            projected.scenario.phase_label,
            projected.scenario.retained_multiplier,
            projected.retained_deferral
        );
    }
}
