use std::sync::Arc;
use crate::config::EngineConfig;
use crate::core::report::{BatchReport, LiquidationOutcome, StepOutcome};
use crate::encrypted::handle::{EUint, Party};
use crate::encrypted::signed_value::SignedValue;
use crate::error::{Error, Result};
use crate::event_log::log::EventLog;
use crate::event_log::snapshot::LedgerSnapshot;
use crate::events::base::EventPayload;
use crate::events::funding::{FundingPublished, FundingRateUpdated, ImpactPublished, RateSource};
use crate::events::liquidation::{LiquidationCheckRequested, LiquidationCheckResolved};
use crate::events::position::{
    PositionOpened, PositionRemoved, PositionRequested, PositionSettled, RemovalReason,
    SettlementRequested,
};
use crate::funding::accrual::{FundingAccrual, FundingState, PublishedFunding};
use crate::gateway::decryption::DecryptionGateway;
use crate::impact::accrual::{ImpactAccrual, ImpactState, PublishedImpact};
use crate::interfaces::balance_provider::BalanceProvider;
use crate::interfaces::clock::Clock;
use crate::interfaces::coprocessor::Coprocessor;
use crate::interfaces::oracle::PriceOracle;
use crate::ledger::position_ledger::PositionLedger;
use crate::liquidation::checker::LiquidationChecker;
use crate::observability::metrics::{
    LIQUIDATIONS_FLAGGED, LIQUIDATION_CHECKS_REQUESTED, POSITIONS_OPENED, POSITIONS_REMOVED,
    POSITIONS_REQUESTED, POSITIONS_SETTLED, SETTLEMENT_PAYOUT,
};
use crate::observability::tracing::position_span;
use crate::price::oracle_guard::OracleGuard;
use crate::settlement::calculator::SettlementCalculator;
use crate::settlement::pool::LiquidityPool;
use crate::types::ids::{PositionId, UserId};
use crate::types::position::{
    CloseCause, Position, PositionStatus, SettlementReceipt, SettlementRequests, Side,
};
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

/// Transaction boundary of the ledger.
///
/// Every public entry point is one atomic call: the checks that can fail run
/// before anything is written, and the coprocessor's transient permissions
/// are dropped when the call returns, whatever its result. Handles that must
/// outlive the call are persisted for [`Party::Engine`] explicitly.
pub struct Engine<C: Coprocessor, B: BalanceProvider> {
    config: EngineConfig,
    coprocessor: C,
    bank: B,
    oracle: Box<dyn PriceOracle + Send + Sync>,
    oracle_guard: OracleGuard,
    clock: Arc<dyn Clock + Send + Sync>,
    ledger: PositionLedger,
    funding: FundingAccrual,
    impact: ImpactAccrual,
    pool: LiquidityPool,
    checker: LiquidationChecker,
    events: EventLog,
}

impl<C: Coprocessor, B: BalanceProvider> Engine<C, B> {
    pub fn new(
        config: EngineConfig,
        mut coprocessor: C,
        bank: B,
        oracle: Box<dyn PriceOracle + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self> {
        if config.risk.max_leverage == 0 {
            return Err(Error::ConfigError("max_leverage must be positive".to_string()));
        }

        let now = clock.now();
        let funding = FundingAccrual::new(&mut coprocessor, config.funding.clone(), now)?;
        let impact = ImpactAccrual::new(&mut coprocessor, config.market.impact_factor_bps)?;
        coprocessor.end_transaction();

        tracing::info!(
            "Engine started for {}: mm={}bps, max_leverage={}x",
            config.market.symbol,
            config.risk.maintenance_margin_bps,
            config.risk.max_leverage
        );

        Ok(Engine {
            oracle_guard: OracleGuard::new(config.market.oracle_max_age_secs),
            checker: LiquidationChecker::new(config.risk.maintenance_margin_bps),
            config,
            coprocessor,
            bank,
            oracle,
            clock,
            ledger: PositionLedger::new(),
            funding,
            impact,
            pool: LiquidityPool::new(),
            events: EventLog::new(),
        })
    }

    fn transaction<T>(&mut self, call: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = call(self);
        self.coprocessor.end_transaction();
        result
    }

    // ---------------------------------------------------------------------
    // Trader entry points
    // ---------------------------------------------------------------------

    /// Records a `Requested` position and moves `collateral` from the owner
    /// into pool escrow. `size_input` must be an encrypted input held by
    /// `owner`.
    pub fn open_position_request(
        &mut self,
        owner: UserId,
        side: Side,
        size_input: EUint,
        collateral: u64,
        take_profit: Option<Price>,
        stop_loss: Option<Price>,
    ) -> Result<PositionId> {
        self.transaction(|engine| {
            engine.open_position_request_inner(owner, side, size_input, collateral, take_profit, stop_loss)
        })
    }

    fn open_position_request_inner(
        &mut self,
        owner: UserId,
        side: Side,
        size_input: EUint,
        collateral: u64,
        take_profit: Option<Price>,
        stop_loss: Option<Price>,
    ) -> Result<PositionId> {
        let now = self.clock.now();
        let size = self.coprocessor.verify_input(size_input, owner)?;

        if collateral < self.config.risk.min_collateral {
            return Err(Error::InvalidInput(format!(
                "collateral {} below minimum {}",
                collateral, self.config.risk.min_collateral
            )));
        }
        if take_profit.is_some_and(|p| p.is_zero()) || stop_loss.is_some_and(|p| p.is_zero()) {
            return Err(Error::InvalidInput("trigger prices must be positive".to_string()));
        }
        (collateral as u128)
            .checked_mul(self.config.risk.max_leverage as u128)
            .ok_or_else(|| Error::overflow("max position size"))?;

        let cop = &mut self.coprocessor;
        cop.allow(size.into(), Party::Engine)?;
        let entry_funding = SignedValue::zero(cop);
        let entry_impact = SignedValue::zero(cop);
        entry_funding.allow(cop, Party::Engine)?;
        entry_impact.allow(cop, Party::Engine)?;

        let id = self.ledger.next_id();
        let reference = format!("collateral {}", id);
        self.bank.debit(owner, collateral, &reference)?;
        if let Err(e) = self.pool.escrow_collateral(collateral) {
            self.bank.credit(owner, collateral, &reference)?;
            return Err(e);
        }

        self.ledger.insert(Position {
            id,
            owner,
            side,
            size,
            collateral,
            entry_price: Price::zero(),
            entry_funding,
            entry_impact,
            status: PositionStatus::Requested,
            removed: false,
            take_profit,
            stop_loss,
            pending_liquidation_flag: None,
            pending_liquidation_price: Price::zero(),
            settlement_price: Price::zero(),
            close_cause: None,
            validation: None,
            liquidation_check: None,
            settlement: None,
            receipt: None,
            created_at: now,
            updated_at: now,
        })?;

        POSITIONS_REQUESTED.inc();
        tracing::info!("Position {} requested by {}: {:?}, collateral={}", id, owner, side, collateral);
        self.events.append(
            EventPayload::PositionRequested(PositionRequested {
                position_id: id,
                owner,
                side,
                collateral,
            }),
            now,
        );
        Ok(id)
    }

    /// Withdraws a request that has not opened yet. Collateral is refunded.
    pub fn cancel_position_request(&mut self, id: PositionId, caller: UserId) -> Result<()> {
        self.transaction(|engine| {
            let position = engine.ledger.get(id)?.clone();
            if position.owner != caller {
                return Err(Error::Unauthorized { position_id: id, caller });
            }
            engine.remove_request(&position, RemovalReason::Cancelled)
        })
    }

    /// Owner-initiated close of an `Open` position at the oracle price.
    pub fn close_position(&mut self, id: PositionId, caller: UserId) -> Result<()> {
        self.transaction(|engine| {
            let position = engine.ledger.ensure_status(id, PositionStatus::Open, "close")?;
            if position.owner != caller {
                return Err(Error::Unauthorized { position_id: id, caller });
            }
            let now = engine.clock.now();
            let price = engine.oracle_guard.latest(engine.oracle.as_ref(), now)?;
            engine.begin_settlement(id, CloseCause::User, price)
        })
    }

    // ---------------------------------------------------------------------
    // Keeper entry points
    // ---------------------------------------------------------------------

    /// Advances each position one lifecycle step.
    pub fn process(&mut self, ids: &[PositionId]) -> BatchReport {
        let mut report = BatchReport::default();
        for &id in ids {
            let _span = position_span(id).entered();
            match self.step(id) {
                Ok(outcome) => report.record(id, outcome),
                Err(e) => report.fail(id, &e),
            }
        }
        self.coprocessor.end_transaction();
        report
    }

    fn step(&mut self, id: PositionId) -> Result<StepOutcome> {
        let position = self.ledger.get(id)?;
        if position.removed {
            return Ok(StepOutcome::Idle);
        }
        let status = position.status;
        match status {
            PositionStatus::Requested => self.validate_request(id),
            PositionStatus::Pending => self.resolve_request(id),
            PositionStatus::Open => self.supervise_open(id),
            PositionStatus::AwaitingSettlement => Ok(match self.settle(id)? {
                Some(_) => StepOutcome::Advanced,
                None => StepOutcome::Waiting,
            }),
            PositionStatus::Liquidated | PositionStatus::Closed => Ok(StepOutcome::Idle),
        }
    }

    /// `Requested -> Pending`: asks for a reveal of `0 < size <= collateral * max_leverage`.
    fn validate_request(&mut self, id: PositionId) -> Result<StepOutcome> {
        let now = self.clock.now();
        let position = self.ledger.get(id)?;
        let (size, collateral) = (position.size, position.collateral);

        let max_size = (collateral as u128)
            .checked_mul(self.config.risk.max_leverage as u128)
            .ok_or_else(|| Error::overflow("max position size"))?;

        let cop = &mut self.coprocessor;
        let zero = cop.trivial_encrypt(0);
        let max_size = cop.trivial_encrypt(max_size);
        let is_zero = cop.eq(size, zero)?;
        let non_zero = cop.not(is_zero)?;
        let too_large = cop.lt(max_size, size)?;
        let within_leverage = cop.not(too_large)?;
        let valid = cop.and(non_zero, within_leverage)?;
        cop.allow(valid.into(), Party::Engine)?;
        let validation = DecryptionGateway::request_flag(cop, valid, now)?;

        self.ledger.transition(id, PositionStatus::Pending, now)?;
        let position = self.ledger.get_mut(id)?;
        position.validation = Some(validation);
        Ok(StepOutcome::Advanced)
    }

    /// `Pending -> Open`, or removal with a refund when the request was invalid.
    fn resolve_request(&mut self, id: PositionId) -> Result<StepOutcome> {
        let position = self.ledger.get(id)?.clone();
        let Some(validation) = position.validation else {
            return Err(Error::InvalidInput(format!("position {} has no validation request", id)));
        };
        let Some(valid) = DecryptionGateway::poll_bool(&self.coprocessor, &validation)? else {
            return Ok(StepOutcome::Waiting);
        };

        if !valid {
            self.remove_request(&position, RemovalReason::Invalid)?;
            DecryptionGateway::discard(&mut self.coprocessor, &validation);
            self.ledger.get_mut(id)?.validation = None;
            return Ok(StepOutcome::Advanced);
        }

        let now = self.clock.now();
        let price = self.oracle_guard.latest(self.oracle.as_ref(), now)?;
        if self.pool.escrow < position.collateral {
            return Err(Error::InsufficientBalance {
                required: position.collateral,
                available: self.pool.escrow,
            });
        }

        let cop = &mut self.coprocessor;
        self.funding.poke_funding(cop, now)?;
        let entry_impact = self.impact.entry_impact(cop, self.funding.state(), position.side, position.size)?;
        entry_impact.allow(cop, Party::Engine)?;
        entry_impact.allow(cop, Party::User(position.owner))?;
        let entry_funding = self.funding.snapshot(position.side);

        self.pool.commit_collateral(position.collateral)?;
        self.funding.add_open_interest(cop, position.side, position.size)?;
        self.impact.record(cop, &entry_impact)?;

        self.ledger.transition(id, PositionStatus::Open, now)?;
        let opened = self.ledger.get_mut(id)?;
        opened.entry_price = price;
        opened.entry_funding = entry_funding;
        opened.entry_impact = entry_impact;
        opened.validation = None;
        DecryptionGateway::discard(&mut self.coprocessor, &validation);

        POSITIONS_OPENED.inc();
        tracing::info!("Position {} opened at {}", id, price);
        self.events.append(
            EventPayload::PositionOpened(PositionOpened {
                position_id: id,
                side: position.side,
                entry_price: price,
            }),
            now,
        );
        Ok(StepOutcome::Advanced)
    }

    fn remove_request(&mut self, position: &Position, reason: RemovalReason) -> Result<()> {
        let removable = matches!(position.status, PositionStatus::Requested | PositionStatus::Pending);
        if position.removed || !removable {
            return Err(Error::InvalidStateTransition {
                position_id: position.id,
                from: position.status,
                action: "remove",
            });
        }

        let now = self.clock.now();
        self.pool.release_escrow(position.collateral)?;
        let reference = format!("refund {}", position.id);
        if let Err(e) = self.bank.credit(position.owner, position.collateral, &reference) {
            self.pool.escrow_collateral(position.collateral)?;
            return Err(e);
        }
        self.ledger.mark_removed(position.id, now)?;

        POSITIONS_REMOVED.inc();
        tracing::info!("Position {} removed ({:?}), refunded {}", position.id, reason, position.collateral);
        self.events.append(
            EventPayload::PositionRemoved(PositionRemoved {
                position_id: position.id,
                reason,
                refunded: position.collateral,
            }),
            now,
        );
        Ok(())
    }

    /// An `Open` position resolves its liquidation check if one is out,
    /// otherwise it is tested against its take-profit and stop-loss.
    fn supervise_open(&mut self, id: PositionId) -> Result<StepOutcome> {
        let position = self.ledger.get(id)?;
        if position.liquidation_check.is_some() {
            return Ok(self.resolve_liquidation_check(id)?.into());
        }
        if position.take_profit.is_none() && position.stop_loss.is_none() {
            return Ok(StepOutcome::Idle);
        }

        let now = self.clock.now();
        let price = self.oracle_guard.latest(self.oracle.as_ref(), now)?;
        match self.ledger.get(id)?.triggered_exit(price) {
            Some(cause) => {
                tracing::info!("Position {} hit {:?} at {}", id, cause, price);
                self.begin_settlement(id, cause, price)?;
                Ok(StepOutcome::Advanced)
            }
            None => Ok(StepOutcome::Idle),
        }
    }

    /// `Open -> AwaitingSettlement`. Accrues funding, takes the size out of
    /// open interest and asks for the reveals settlement needs.
    fn begin_settlement(&mut self, id: PositionId, cause: CloseCause, price: Price) -> Result<()> {
        let now = self.clock.now();
        let position = self.ledger.ensure_status(id, PositionStatus::Open, "settle")?.clone();

        let cop = &mut self.coprocessor;
        self.funding.poke_funding(cop, now)?;
        let funding_credit = self.funding.funding_credit(cop, position.side, position.size, &position.entry_funding)?;
        funding_credit.allow(cop, Party::Engine)?;

        let requests = SettlementRequests {
            size: DecryptionGateway::request(cop, position.size, now)?,
            funding: DecryptionGateway::request_signed(cop, &funding_credit, now)?,
            impact: DecryptionGateway::request_signed(cop, &position.entry_impact, now)?,
        };
        self.funding.remove_open_interest(cop, position.side, position.size)?;
        if let Some(check) = position.liquidation_check {
            DecryptionGateway::discard(cop, &check);
        }

        self.ledger.transition(id, PositionStatus::AwaitingSettlement, now)?;
        let closing = self.ledger.get_mut(id)?;
        closing.close_cause = Some(cause);
        closing.settlement_price = price;
        closing.settlement = Some(requests);
        closing.liquidation_check = None;
        closing.pending_liquidation_flag = None;

        tracing::info!("Position {} awaiting settlement: {:?} at {}", id, cause, price);
        self.events.append(
            EventPayload::SettlementRequested(SettlementRequested {
                position_id: id,
                cause,
                settlement_price: price,
            }),
            now,
        );
        Ok(())
    }

    /// Computes the encrypted liquidation flag of an `Open` position at the
    /// validated oracle price and asks for its reveal. A newer check
    /// supersedes an unresolved one.
    pub fn check_liquidation(&mut self, id: PositionId) -> Result<()> {
        self.transaction(|engine| {
            let now = engine.clock.now();
            let mark_price = engine.oracle_guard.latest(engine.oracle.as_ref(), now)?;
            engine.request_liquidation_check(id, mark_price)
        })
    }

    fn request_liquidation_check(&mut self, id: PositionId, mark_price: Price) -> Result<()> {
        if mark_price.is_zero() {
            return Err(Error::InvalidInput("mark price must be positive".to_string()));
        }
        let now = self.clock.now();
        let position = self.ledger.ensure_status(id, PositionStatus::Open, "check liquidation")?.clone();

        let cop = &mut self.coprocessor;
        self.funding.poke_funding(cop, now)?;
        let flag = self.checker.liquidation_flag(cop, &position, mark_price, &self.funding)?;
        cop.allow(flag.into(), Party::Engine)?;
        let request = DecryptionGateway::request_flag(cop, flag, now)?;
        if let Some(superseded) = position.liquidation_check {
            DecryptionGateway::discard(cop, &superseded);
        }

        let checked = self.ledger.get_mut(id)?;
        checked.pending_liquidation_flag = Some(flag);
        checked.pending_liquidation_price = mark_price;
        checked.liquidation_check = Some(request);
        checked.updated_at = now;

        LIQUIDATION_CHECKS_REQUESTED.inc();
        self.events.append(
            EventPayload::LiquidationCheckRequested(LiquidationCheckRequested {
                position_id: id,
                mark_price,
            }),
            now,
        );
        Ok(())
    }

    /// Requests checks for every id at one validated oracle price.
    pub fn request_liquidation_checks(&mut self, ids: &[PositionId]) -> Result<BatchReport> {
        self.transaction(|engine| {
            let now = engine.clock.now();
            let mark_price = engine.oracle_guard.latest(engine.oracle.as_ref(), now)?;

            let mut report = BatchReport::default();
            for &id in ids {
                let _span = position_span(id).entered();
                match engine.request_liquidation_check(id, mark_price) {
                    Ok(()) => report.record(id, StepOutcome::Advanced),
                    Err(e) => report.fail(id, &e),
                }
            }
            Ok(report)
        })
    }

    /// Acts on a revealed liquidation flag. Not requested or not ready: no-op.
    pub fn finalize_liquidation_check(&mut self, id: PositionId) -> Result<LiquidationOutcome> {
        self.transaction(|engine| engine.resolve_liquidation_check(id))
    }

    fn resolve_liquidation_check(&mut self, id: PositionId) -> Result<LiquidationOutcome> {
        let position = self.ledger.get(id)?;
        let Some(check) = position.liquidation_check else {
            return Ok(LiquidationOutcome::NotRequested);
        };
        if !position.is_open() {
            DecryptionGateway::discard(&mut self.coprocessor, &check);
            let stale = self.ledger.get_mut(id)?;
            stale.liquidation_check = None;
            stale.pending_liquidation_flag = None;
            return Ok(LiquidationOutcome::Stale);
        }
        let mark_price = position.pending_liquidation_price;

        let Some(liquidatable) = DecryptionGateway::poll_bool(&self.coprocessor, &check)? else {
            return Ok(LiquidationOutcome::Pending);
        };

        let now = self.clock.now();
        let outcome = if liquidatable {
            self.begin_settlement(id, CloseCause::Liquidation, mark_price)?;
            LIQUIDATIONS_FLAGGED.inc();
            tracing::warn!("Position {} liquidatable at {}", id, mark_price);
            LiquidationOutcome::Liquidating
        } else {
            DecryptionGateway::discard(&mut self.coprocessor, &check);
            let healthy = self.ledger.get_mut(id)?;
            healthy.liquidation_check = None;
            healthy.pending_liquidation_flag = None;
            healthy.updated_at = now;
            LiquidationOutcome::Healthy
        };

        self.events.append(
            EventPayload::LiquidationCheckResolved(LiquidationCheckResolved {
                position_id: id,
                liquidatable,
                mark_price,
            }),
            now,
        );
        Ok(outcome)
    }

    pub fn finalize_liquidation_checks(&mut self, ids: &[PositionId]) -> BatchReport {
        let mut report = BatchReport::default();
        for &id in ids {
            let _span = position_span(id).entered();
            match self.resolve_liquidation_check(id) {
                Ok(outcome) => report.record(id, outcome.into()),
                Err(e) => report.fail(id, &e),
            }
        }
        self.coprocessor.end_transaction();
        report
    }

    /// Pays out an `AwaitingSettlement` position once its reveals landed.
    /// Returns `None` while they are outstanding.
    pub fn settle_position(&mut self, id: PositionId) -> Result<Option<SettlementReceipt>> {
        self.transaction(|engine| engine.settle(id))
    }

    fn settle(&mut self, id: PositionId) -> Result<Option<SettlementReceipt>> {
        let position = self.ledger.ensure_status(id, PositionStatus::AwaitingSettlement, "settle")?;
        let Some(requests) = position.settlement else {
            return Err(Error::InvalidInput(format!("position {} has no settlement requests", id)));
        };

        let size = DecryptionGateway::poll(&self.coprocessor, &requests.size)?;
        let funding = DecryptionGateway::poll_signed(&self.coprocessor, &requests.funding)?;
        let impact = DecryptionGateway::poll_signed(&self.coprocessor, &requests.impact)?;
        let (Some(size), Some(funding), Some(impact)) = (size, funding, impact) else {
            return Ok(None);
        };

        let cause = position.close_cause.unwrap_or(CloseCause::User);
        let fee_bps = match cause {
            CloseCause::Liquidation => self.config.fees.liquidation_fee_bps,
            _ => self.config.fees.close_fee_bps,
        };
        let pnl = SettlementCalculator::pnl(position.side, size, position.entry_price, position.settlement_price)?;
        let amounts = SettlementCalculator::settle(position.collateral, pnl, funding, impact, fee_bps)?;
        let owner = position.owner;

        self.pool.ensure_solvent(amounts.payout)?;
        if amounts.payout > 0 {
            self.bank.credit(owner, amounts.payout, &format!("settlement {}", id))?;
        }
        self.pool.pay_out(amounts.payout, amounts.fee)?;

        let now = self.clock.now();
        let status = if cause == CloseCause::Liquidation && amounts.payout == 0 {
            PositionStatus::Liquidated
        } else {
            PositionStatus::Closed
        };
        let receipt = SettlementReceipt {
            position_id: id,
            size,
            pnl: amounts.pnl,
            funding,
            impact,
            equity: amounts.equity,
            fee: amounts.fee,
            payout: amounts.payout,
            status,
            settled_at: now,
        };

        self.ledger.transition(id, status, now)?;
        let settled = self.ledger.get_mut(id)?;
        settled.receipt = Some(receipt);
        settled.settlement = None;
        DecryptionGateway::release(&mut self.coprocessor, &requests.size);
        DecryptionGateway::discard(&mut self.coprocessor, &requests.funding.sign);
        DecryptionGateway::discard(&mut self.coprocessor, &requests.funding.magnitude);
        DecryptionGateway::release_signed(&mut self.coprocessor, &requests.impact);

        POSITIONS_SETTLED.inc();
        SETTLEMENT_PAYOUT.inc_by(amounts.payout as f64);
        tracing::info!(
            "Position {} settled {:?}: equity={}, fee={}, payout={}",
            id,
            status,
            amounts.equity,
            amounts.fee,
            amounts.payout
        );
        self.events.append(EventPayload::PositionSettled(PositionSettled { receipt }), now);
        Ok(Some(receipt))
    }

    pub fn settle_positions(&mut self, ids: &[PositionId]) -> BatchReport {
        let mut report = BatchReport::default();
        for &id in ids {
            let _span = position_span(id).entered();
            match self.settle(id) {
                Ok(Some(_)) => report.record(id, StepOutcome::Advanced),
                Ok(None) => report.record(id, StepOutcome::Waiting),
                Err(e) => report.fail(id, &e),
            }
        }
        self.coprocessor.end_transaction();
        report
    }

    // ---------------------------------------------------------------------
    // Funding and impact
    // ---------------------------------------------------------------------

    pub fn poke_funding(&mut self) -> Result<bool> {
        self.transaction(|engine| {
            let now = engine.clock.now();
            engine.funding.poke_funding(&mut engine.coprocessor, now)
        })
    }

    pub fn set_funding_rate_from_skew(&mut self) -> Result<()> {
        self.transaction(|engine| {
            let now = engine.clock.now();
            engine.funding.set_funding_rate_from_skew(&mut engine.coprocessor, now)?;
            engine.events.append(
                EventPayload::FundingRateUpdated(FundingRateUpdated { source: RateSource::Skew }),
                now,
            );
            Ok(())
        })
    }

    /// Administrative override of the per-second X18 rate.
    pub fn set_funding_rate(&mut self, rate_x18: i128) -> Result<()> {
        let max = self.config.funding.max_funding_rate_x18 as u128;
        if rate_x18.unsigned_abs() > max {
            return Err(Error::InvalidInput(format!(
                "funding rate {} exceeds max {}",
                rate_x18, max
            )));
        }
        self.transaction(|engine| {
            let now = engine.clock.now();
            let rate = SignedValue::from_plain(&mut engine.coprocessor, rate_x18);
            engine.funding.set_funding_rate(&mut engine.coprocessor, now, rate)?;
            engine.events.append(
                EventPayload::FundingRateUpdated(FundingRateUpdated { source: RateSource::Explicit }),
                now,
            );
            Ok(())
        })
    }

    pub fn request_funding_publication(&mut self) -> Result<()> {
        self.transaction(|engine| {
            let now = engine.clock.now();
            engine.funding.request_publication(&mut engine.coprocessor, now)
        })
    }

    pub fn finalize_funding_publication(&mut self) -> Result<Option<PublishedFunding>> {
        self.transaction(|engine| {
            let published = engine.funding.finalize_publication(&engine.coprocessor)?;
            if let Some(published) = published {
                let now = engine.clock.now();
                engine.events.append(EventPayload::FundingPublished(FundingPublished { published }), now);
            }
            Ok(published)
        })
    }

    pub fn request_impact_publication(&mut self) -> Result<()> {
        self.transaction(|engine| {
            let now = engine.clock.now();
            engine.impact.request_publication(&mut engine.coprocessor, now)
        })
    }

    pub fn finalize_impact_publication(&mut self) -> Result<Option<PublishedImpact>> {
        self.transaction(|engine| {
            let published = engine.impact.finalize_publication(&engine.coprocessor)?;
            if let Some(published) = published {
                let now = engine.clock.now();
                engine.events.append(EventPayload::ImpactPublished(ImpactPublished { published }), now);
            }
            Ok(published)
        })
    }

    // ---------------------------------------------------------------------
    // Pool
    // ---------------------------------------------------------------------

    pub fn add_liquidity(&mut self, amount: u64) -> Result<()> {
        self.pool.add_liquidity(amount)
    }

    // ---------------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------------

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::new(
            self.clock.now(),
            self.ledger.positions().to_vec(),
            self.funding.state().clone(),
            self.impact.state().clone(),
            self.pool.clone(),
            self.events.last_sequence(),
        )
    }

    /// Replaces the ledger state. Handles in the snapshot must belong to
    /// this engine's coprocessor.
    pub fn restore(&mut self, snapshot: LedgerSnapshot) -> Result<()> {
        if snapshot.version > crate::SNAPSHOT_VERSION {
            return Err(Error::UnsupportedSnapshotVersion {
                found: snapshot.version,
                max_supported: crate::SNAPSHOT_VERSION,
            });
        }
        if !snapshot.verify_checksum() {
            return Err(Error::InvalidChecksum);
        }
        if snapshot.next_position_id != snapshot.positions.len() as u64 {
            return Err(Error::InvalidInput(format!(
                "snapshot next id {} does not follow {} positions",
                snapshot.next_position_id,
                snapshot.positions.len()
            )));
        }

        let ledger = PositionLedger::from_positions(snapshot.positions)?;
        self.funding = FundingAccrual::from_state(self.config.funding.clone(), snapshot.funding);
        self.impact = ImpactAccrual::from_state(self.config.market.impact_factor_bps, snapshot.impact);
        self.ledger = ledger;
        self.pool = snapshot.pool;
        self.events = EventLog::resume_after(snapshot.last_event_sequence);

        tracing::info!(
            "Restored {} positions from snapshot taken at {}",
            self.ledger.len(),
            snapshot.taken_at
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn position(&self, id: PositionId) -> Result<&Position> {
        self.ledger.get(id)
    }

    pub fn positions(&self) -> &[Position] {
        self.ledger.positions()
    }

    pub fn active_positions(&self) -> Vec<&Position> {
        self.ledger.iter().filter(|p| p.is_active()).collect()
    }

    pub fn open_positions(&self) -> Vec<&Position> {
        self.ledger.iter().filter(|p| p.is_open()).collect()
    }

    pub fn active_position_ids(&self) -> Vec<PositionId> {
        self.ledger.active_ids()
    }

    pub fn open_position_ids(&self) -> Vec<PositionId> {
        self.ledger.open_ids()
    }

    pub fn funding_state(&self) -> &FundingState {
        self.funding.state()
    }

    pub fn impact_state(&self) -> &ImpactState {
        self.impact.state()
    }

    pub fn pool(&self) -> &LiquidityPool {
        &self.pool
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn coprocessor(&self) -> &C {
        &self.coprocessor
    }

    pub fn coprocessor_mut(&mut self) -> &mut C {
        &mut self.coprocessor
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }
}
