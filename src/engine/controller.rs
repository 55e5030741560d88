//! Opportunity admission and cycle orchestration
//!
//! One `run_cycle` call consumes one ranked batch. Opportunities are
//! evaluated strictly in rank order through the gate → sizing → simulation
//! pipeline; the first one to reach an executed outcome wins the cycle,
//! triggers the ledger bookkeeping and ends the batch. Every outcome,
//! whether execution, skip or error, lands in the audit sink and the
//! broadcaster.

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::common::channels::Shutdown;
use crate::common::errors::{EngineError, Result};
use crate::common::traits::{
    AdmissionClassifier, AuditSink, Broadcaster, LedgerClient, MarketDataProvider,
};
use crate::common::types::{
    BalanceConfig, DecisionEvent, DecisionOutcome, OperationRecord, Opportunity,
};
use crate::config::types::EngineSettings;
use crate::engine::classifier::extract_features;
use crate::engine::simulator::ExecutionSimulator;
use crate::engine::sizing;
use crate::engine::state::{TradingState, TradingStateSnapshot};
use crate::engine::types::{CycleReport, ExecutedTrade, RiskPolicy};

/// Batch processor turning ranked opportunities into at most one
/// capital-committing action per cycle
pub struct AdmissionController {
    ledger: Arc<dyn LedgerClient>,
    classifier: Arc<dyn AdmissionClassifier>,
    audit: Arc<dyn AuditSink>,
    broadcaster: Arc<dyn Broadcaster>,
    simulator: ExecutionSimulator,
    settings: EngineSettings,
    /// Single-writer state; holding this lock marks the batch as in flight
    state: Mutex<TradingState>,
}

impl AdmissionController {
    pub fn new(
        settings: EngineSettings,
        ledger: Arc<dyn LedgerClient>,
        market: Option<Arc<dyn MarketDataProvider>>,
        classifier: Arc<dyn AdmissionClassifier>,
        audit: Arc<dyn AuditSink>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        let simulator = ExecutionSimulator::new(market, &settings);
        let state = Mutex::new(TradingState::new(
            settings.default_holder_exchange_id.clone(),
        ));
        Self {
            ledger,
            classifier,
            audit,
            broadcaster,
            simulator,
            settings,
            state,
        }
    }

    /// Read-only state view; `None` while a cycle is in flight
    pub fn state_snapshot(&self) -> Option<TradingStateSnapshot> {
        self.state.try_lock().ok().map(|state| state.snapshot())
    }

    /// Process one ranked batch.
    ///
    /// At most one cycle runs at a time; a trigger arriving while another
    /// cycle holds the state is dropped, not queued.
    #[instrument(skip_all, fields(batch_size = batch.len()))]
    pub async fn run_cycle(&self, batch: &[Opportunity], shutdown: &Shutdown) -> CycleReport {
        let Ok(mut state) = self.state.try_lock() else {
            debug!("cycle trigger dropped: batch already in flight");
            return CycleReport::SkippedInFlight;
        };

        if state.global_sl_tripped() {
            warn!("cycle aborted: global stop loss is tripped");
            return CycleReport::AbortedGlobalStopLoss;
        }

        let holder = state.active_holder_exchange_id.clone();
        let balance = match shutdown.guard(self.ledger.fetch_balance(&holder)).await {
            Ok(Ok(balance)) => balance,
            Ok(Err(err)) => {
                error!(%holder, error = %err, "cycle aborted: balance config load failed");
                return CycleReport::AbortedBalanceLoad(err.to_string());
            }
            Err(_) => return CycleReport::Cancelled,
        };
        info!(%holder, balance = %balance.balance_usdt, "balance config loaded");
        state.cached_balance = Some(balance.clone());

        if self.global_stop_loss_breached(&balance) {
            state.trip_global_sl();
            warn!(
                balance = %balance.balance_usdt,
                "global stop loss tripped; trading halted until operator reset"
            );
            return CycleReport::AbortedGlobalStopLoss;
        }

        let mut evaluated = 0;
        for opportunity in batch {
            if shutdown.is_cancelled() {
                return CycleReport::Cancelled;
            }
            evaluated += 1;

            let started = Instant::now();
            let mut record = OperationRecord::for_opportunity(opportunity);
            if let Some(cached) = state.cached_balance.as_ref() {
                record.balance_before_usdt = cached.balance_usdt;
            }

            let verdict = self
                .evaluate_opportunity(&mut state, opportunity, &mut record, shutdown)
                .await;
            record.execution_time_ms = started.elapsed().as_millis() as u64;

            match verdict {
                Ok(Some(trade)) => {
                    self.record_outcome(&record).await;
                    info!(
                        symbol = %trade.symbol,
                        investment = %trade.investment_usdt,
                        profit = %trade.final_profit_usdt,
                        "opportunity executed; cycle finished"
                    );
                    return CycleReport::Completed {
                        evaluated,
                        executed: Some(trade),
                    };
                }
                Ok(None) => {
                    self.record_outcome(&record).await;
                }
                Err(EngineError::Cancelled) => {
                    record.error_message = Some("cancelled by shutdown".to_string());
                    self.record_outcome(&record).await;
                    return CycleReport::Cancelled;
                }
                Err(err) => {
                    warn!(symbol = %opportunity.symbol, error = %err, "opportunity failed");
                    record.error_message = Some(err.to_string());
                    self.record_outcome(&record).await;
                }
            }
        }

        debug!(evaluated, "cycle finished without executing");
        CycleReport::Completed {
            evaluated,
            executed: None,
        }
    }

    fn global_stop_loss_breached(&self, balance: &BalanceConfig) -> bool {
        let Some(initial_capital) = balance.initial_capital_for_global_sl else {
            return false;
        };
        if initial_capital <= Decimal::ZERO {
            return false;
        }
        let threshold = initial_capital
            * (Decimal::ONE - balance.stop_loss_percent_global / Decimal::from(100));
        balance.balance_usdt < threshold
    }

    /// Run one opportunity through gate, sizing and simulation.
    ///
    /// Errors abort only this opportunity; the caller annotates the record
    /// and moves on.
    async fn evaluate_opportunity(
        &self,
        state: &mut TradingState,
        opportunity: &Opportunity,
        record: &mut OperationRecord,
        shutdown: &Shutdown,
    ) -> Result<Option<ExecutedTrade>> {
        let balance = state
            .cached_balance
            .clone()
            .ok_or_else(|| EngineError::Internal("cycle has no cached balance".to_string()))?;

        let base = sizing::base_investment(&balance, &self.settings);
        if base < self.settings.min_operational_usdt {
            record.skip_reason = Some(format!(
                "investment {} below operational minimum",
                base
            ));
            return Ok(None);
        }

        // Resolve the initial USDT withdrawal fee for the current holder.
        let opportunity = match opportunity.initial_usdt_withdrawal_fee {
            Some(_) => opportunity.clone(),
            None => {
                let quote = shutdown
                    .guard(
                        self.ledger
                            .usdt_withdrawal_quote(&state.active_holder_exchange_id),
                    )
                    .await??;
                match quote {
                    Some(quote) => {
                        debug!(network = %quote.network, fee = %quote.fee_usdt, "withdrawal quote");
                        opportunity.with_initial_withdrawal_fee(quote.fee_usdt)
                    }
                    None => {
                        record.skip_reason =
                            Some("no viable USDT withdrawal network".to_string());
                        return Ok(None);
                    }
                }
            }
        };

        // Cheap gate before any sizing or market work.
        let features = extract_features(&opportunity, base, &balance);
        let prediction = shutdown.guard(self.classifier.predict(&features)).await?;
        record.classifier_should_execute = prediction.should_execute;
        record.classifier_confidence = prediction.confidence;
        if !prediction.should_execute {
            record.skip_reason = Some("classifier rejected".to_string());
            return Ok(None);
        }

        let sized = sizing::adjust_investment(
            &opportunity,
            base,
            balance.balance_usdt,
            &self.settings,
        );
        record.sizing_attempts = sized.attempts_made;
        record.investment_usdt = sized.investment_usdt;
        record.net_profit_usdt = sized.best.net_profit_usdt;
        record.net_profit_percentage = sized.best.net_profit_percentage;

        let policy = RiskPolicy::from_balance(&balance);
        let report = self
            .simulator
            .simulate(
                &opportunity,
                &sized.best,
                &policy,
                sized.investment_usdt,
                shutdown,
            )
            .await?;
        record.decision_outcome = report.outcome;
        record.final_profit_usdt = report.final_profit_usdt;
        record.repriced_sell_price = report.repriced_sell_price;

        if !report.outcome.is_executed() {
            return Ok(None);
        }

        // Capital is committed: the ledger sequence runs to completion even
        // if shutdown arrives now, so a debit is never left uncredited.
        let trade = self
            .settle_execution(
                state,
                &opportunity,
                sized.investment_usdt,
                report.final_profit_usdt,
            )
            .await?;
        Ok(Some(ExecutedTrade {
            outcome: report.outcome,
            ..trade
        }))
    }

    /// Move the committed capital through the ledger: debit the source
    /// holder, credit the destination, then switch the active holder.
    async fn settle_execution(
        &self,
        state: &mut TradingState,
        opportunity: &Opportunity,
        investment_usdt: Decimal,
        final_profit_usdt: Decimal,
    ) -> Result<ExecutedTrade> {
        let source = state.active_holder_exchange_id.clone();
        let destination = opportunity.sell_exchange_id.clone();

        // Debit the source from a fresh read, not the cycle cache.
        let mut source_doc = self.ledger.fetch_balance(&source).await?;
        source_doc.balance_usdt -= investment_usdt;
        self.store_verified(&source_doc).await?;
        if let Some(cached) = state.cached_balance.as_mut() {
            if cached.exchange_id == source {
                cached.balance_usdt = source_doc.balance_usdt;
            }
        }

        // Credit the destination with capital plus outcome.
        let mut dest_doc = self.ledger.fetch_balance(&destination).await?;
        dest_doc.balance_usdt += investment_usdt + final_profit_usdt;
        if dest_doc
            .initial_capital_for_global_sl
            .map_or(true, |capital| capital <= Decimal::ZERO)
        {
            dest_doc.initial_capital_for_global_sl = Some(dest_doc.balance_usdt);
        }
        self.store_verified(&dest_doc).await?;

        info!(
            %source,
            %destination,
            debited = %investment_usdt,
            credited = %(investment_usdt + final_profit_usdt),
            "ledger balances settled"
        );

        if source != destination {
            state.active_holder_exchange_id = destination.clone();
            state.cached_balance = Some(self.ledger.fetch_balance(&destination).await?);
        } else {
            state.cached_balance = Some(dest_doc);
        }

        Ok(ExecutedTrade {
            symbol: opportunity.symbol.clone(),
            buy_exchange_id: opportunity.buy_exchange_id.clone(),
            sell_exchange_id: destination,
            investment_usdt,
            final_profit_usdt,
            outcome: DecisionOutcome::Executed,
        })
    }

    /// Store a balance document with read-after-write verification and a
    /// single retry, so a lost update cannot silently desync the ledger.
    async fn store_verified(&self, doc: &BalanceConfig) -> Result<BalanceConfig> {
        let mut last_error = None;
        for attempt in 0..2 {
            match self.ledger.store_balance(doc).await {
                Ok(updated) => {
                    let check = self.ledger.fetch_balance(&doc.exchange_id).await?;
                    if check.balance_usdt == doc.balance_usdt {
                        return Ok(updated);
                    }
                    warn!(
                        exchange = %doc.exchange_id,
                        attempt,
                        expected = %doc.balance_usdt,
                        observed = %check.balance_usdt,
                        "ledger verification mismatch"
                    );
                }
                Err(err) => {
                    warn!(exchange = %doc.exchange_id, attempt, error = %err, "ledger update failed");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EngineError::Ledger(format!(
                "balance update for {} could not be verified",
                doc.exchange_id
            ))
        }))
    }

    async fn record_outcome(&self, record: &OperationRecord) {
        self.audit.append(record).await;
        self.broadcaster.publish(DecisionEvent::from_record(record));
    }
}
