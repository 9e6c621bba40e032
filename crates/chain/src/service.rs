use chrono::{NaiveDate, Utc};

use agritrace_auth::{authorize, ChainAction, PasswordHash, Role};
use agritrace_core::{
    BatchId, CropId, DeliveryId, DomainError, Money, PaymentId, Quantity, TransactionId, UserId,
};
use agritrace_crops::{Crop, CropStatus, NewCrop};
use agritrace_deliveries::{Delivery, DeliveryStatus, NewDelivery};
use agritrace_journey::{self as journey, BatchJourney};
use agritrace_ledger::{StepType, TraceAppend, TraceEvent, TraceLedger};
use agritrace_payments::{
    NewPayment, NewTransaction, Payment, PaymentStatus, Transaction,
};
use agritrace_store::{
    CropFilter, CropStore, DeliveryFilter, DeliveryStore, PaymentFilter, PaymentStore,
    TransactionStore, UserFilter, UserStore,
};
use agritrace_users::{NewUser, User};

use crate::error::ChainError;

/// Fresh-id retry budget for batch registration. Collisions on an 8-hex
/// suffix are vanishingly rare; two consecutive ones mean something else is
/// wrong, so the budget stays small.
const BATCH_ID_ATTEMPTS: usize = 3;

/// The acting user, as supplied by the session service.
///
/// The core trusts this pair; verifying the session is the collaborator's
/// job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

/// Registration input for [`ChainService::register_user`].
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub password: String,
}

/// Outcome of [`ChainService::record_sale`].
#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub trace: TraceEvent,
    /// Present when the buyer is a registered user.
    pub transaction: Option<Transaction>,
}

/// The supply-chain operations, generic over the store and ledger backends.
pub struct ChainService<S, L> {
    stores: S,
    ledger: L,
}

impl<S, L> ChainService<S, L>
where
    S: UserStore + CropStore + DeliveryStore + TransactionStore + PaymentStore,
    L: TraceLedger,
{
    pub fn new(stores: S, ledger: L) -> Self {
        Self { stores, ledger }
    }

    // ── Accounts ────────────────────────────────────────────────────────

    /// Open registration: anyone may create an account in any role.
    pub fn register_user(&self, input: RegisterUser) -> Result<User, ChainError> {
        if self.stores.find_user_by_email(input.email.trim())?.is_some() {
            return Err(ChainError::EmailTaken);
        }

        let user = User::register(
            UserId::new(),
            NewUser {
                name: input.name,
                email: input.email,
                phone: input.phone,
                role: input.role,
                password_hash: PasswordHash::derive(&input.password)?,
            },
            Utc::now(),
        )?;

        // The pre-check above races with concurrent registration; the store's
        // unique constraint is the arbiter.
        match self.stores.insert_user(user.clone()) {
            Ok(()) => {
                tracing::info!(user_id = %user.id_typed(), role = %user.role(), "user registered");
                Ok(user)
            }
            Err(agritrace_store::StoreError::Constraint(_)) => Err(ChainError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// Credential check. `None` for unknown email, wrong password, or an
    /// account that is not active.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, ChainError> {
        let Some(user) = self.stores.find_user_by_email(email)? else {
            return Ok(None);
        };
        if !user.is_active() || !user.password_hash().verify(password) {
            return Ok(None);
        }
        Ok(Some(user))
    }

    pub fn approve_user(&self, actor: Actor, user_id: UserId) -> Result<(), ChainError> {
        self.set_account_status(actor, user_id, User::approve)
    }

    pub fn deactivate_user(&self, actor: Actor, user_id: UserId) -> Result<(), ChainError> {
        self.set_account_status(actor, user_id, User::deactivate)
    }

    pub fn reactivate_user(&self, actor: Actor, user_id: UserId) -> Result<(), ChainError> {
        self.set_account_status(actor, user_id, User::reactivate)
    }

    fn set_account_status(
        &self,
        actor: Actor,
        user_id: UserId,
        mutate: impl FnOnce(&mut User) -> Result<(), DomainError>,
    ) -> Result<(), ChainError> {
        authorize(actor.role, ChainAction::ManageUsers)?;
        let mut user = self
            .stores
            .get_user(&user_id)?
            .ok_or(ChainError::NotFound("user"))?;
        mutate(&mut user)?;
        if !self.stores.update_user_status(&user_id, user.status())? {
            return Err(ChainError::NotFound("user"));
        }
        tracing::info!(user_id = %user_id, status = ?user.status(), "account status changed");
        Ok(())
    }

    pub fn search_users(&self, actor: Actor, filter: &UserFilter) -> Result<Vec<User>, ChainError> {
        authorize(actor.role, ChainAction::ManageUsers)?;
        Ok(self.stores.list_users(filter)?)
    }

    // ── Crops ───────────────────────────────────────────────────────────

    /// Farmer registers a harvested batch: a fresh batch id, the crop row,
    /// and the opening `Harvest` ledger event.
    ///
    /// Batch-id collisions surface as store constraint violations and are
    /// retried with a freshly generated id. A crop whose `Harvest` append
    /// then fails stays registered with an empty timeline — "no provenance
    /// yet" is an observable, recoverable state.
    pub fn register_crop(&self, actor: Actor, input: NewCrop) -> Result<Crop, ChainError> {
        authorize(actor.role, ChainAction::RegisterCrop)?;

        let mut last_collision = None;
        for _ in 0..BATCH_ID_ATTEMPTS {
            let crop = Crop::register(
                CropId::new(),
                actor.id,
                BatchId::generate(),
                input.clone(),
                Utc::now(),
            )?;

            match self.stores.insert_crop(crop.clone()) {
                Ok(()) => {
                    self.ledger.append(TraceAppend {
                        batch_id: crop.batch_id().clone(),
                        step_type: StepType::Harvest,
                        actor: actor.id,
                        details: "Crop harvested by farmer".to_string(),
                        location: None,
                    })?;
                    tracing::info!(
                        crop_id = %crop.id_typed(),
                        batch_id = %crop.batch_id(),
                        "crop registered"
                    );
                    return Ok(crop);
                }
                Err(agritrace_store::StoreError::Constraint(msg)) => {
                    tracing::warn!(batch_id = %crop.batch_id(), "batch id collision, retrying");
                    last_collision = Some(msg);
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(?last_collision, "batch id retry budget exhausted");
        Err(ChainError::BatchIdExhausted)
    }

    pub fn available_crops(&self, filter: &CropFilter) -> Result<Vec<Crop>, ChainError> {
        let filter = CropFilter {
            status: Some(CropStatus::Available),
            ..filter.clone()
        };
        Ok(self.stores.list_crops(&filter)?)
    }

    pub fn crops_of(&self, farmer: UserId, filter: &CropFilter) -> Result<Vec<Crop>, ChainError> {
        let filter = CropFilter {
            farmer: Some(farmer),
            ..filter.clone()
        };
        Ok(self.stores.list_crops(&filter)?)
    }

    /// Owning farmer's direct status edit — the audited escape hatch.
    ///
    /// Unlike the guarded transitions this may jump between any two distinct
    /// states, but it always leaves its own ledger event behind (`Sale` when
    /// the target is `Sold`, a `StatusOverride` step otherwise).
    pub fn override_crop_status(
        &self,
        actor: Actor,
        crop_id: CropId,
        new_status: CropStatus,
    ) -> Result<(), ChainError> {
        authorize(actor.role, ChainAction::OverrideCropStatus)?;
        let mut crop = self
            .stores
            .get_crop(&crop_id)?
            .ok_or(ChainError::NotFound("crop"))?;

        let previous = crop.status();
        crop.override_status(actor.id, new_status)?;
        self.stores.set_crop_status(&crop_id, new_status)?;

        let step_type = if new_status == CropStatus::Sold {
            StepType::Sale
        } else {
            StepType::Other("StatusOverride".to_string())
        };
        self.ledger.append(TraceAppend {
            batch_id: crop.batch_id().clone(),
            step_type,
            actor: actor.id,
            details: format!("Status set to '{new_status}' by farmer (was '{previous}')"),
            location: None,
        })?;
        tracing::info!(crop_id = %crop_id, from = %previous, to = %new_status, "farmer override");
        Ok(())
    }

    // ── Deliveries ──────────────────────────────────────────────────────

    /// Distributor accepts an available crop: the crop enters transit, a
    /// pending delivery is created, the custody transaction is recorded, and
    /// the `Transport` event is appended.
    ///
    /// The conditional crop update is the serialization point — of two
    /// distributors racing for the same batch, exactly one wins and the
    /// other sees a concurrency conflict. Later failures compensate the
    /// earlier store writes.
    pub fn accept_crop(
        &self,
        actor: Actor,
        crop_id: CropId,
        retailer_id: UserId,
        transport_details: String,
        expected_date: NaiveDate,
    ) -> Result<Delivery, ChainError> {
        authorize(actor.role, ChainAction::AcceptCrop)?;

        let crop = self
            .stores
            .get_crop(&crop_id)?
            .ok_or(ChainError::NotFound("crop"))?;
        let retailer = self
            .stores
            .get_user(&retailer_id)?
            .ok_or(ChainError::NotFound("retailer"))?;
        if retailer.role() != Role::Retailer {
            return Err(DomainError::validation("assignee is not a retailer").into());
        }

        let delivery = Delivery::create(
            DeliveryId::new(),
            NewDelivery {
                crop: crop_id,
                distributor: actor.id,
                retailer: retailer_id,
                transport_details: transport_details.clone(),
                expected_date,
            },
            Utc::now(),
        )?;
        let transaction = Transaction::create(
            TransactionId::new(),
            NewTransaction {
                crop: crop_id,
                from: crop.farmer(),
                to: actor.id,
                kind: "procurement".to_string(),
                amount: None,
                transport_details: Some(transport_details.clone()),
            },
            Utc::now(),
        )?;

        // Serialization point: the losing concurrent distributor stops here.
        self.stores
            .update_crop_status(&crop_id, CropStatus::Available, CropStatus::InTransit)?;

        if let Err(e) = self.stores.insert_delivery(delivery.clone()) {
            self.revert_crop(&crop_id, CropStatus::InTransit, CropStatus::Available);
            return Err(e.into());
        }

        if let Err(e) = self.ledger.append(TraceAppend {
            batch_id: crop.batch_id().clone(),
            step_type: StepType::Transport,
            actor: actor.id,
            details: format!("Picked up by distributor - {transport_details}"),
            location: None,
        }) {
            self.revert_delivery(&delivery.id_typed());
            self.revert_crop(&crop_id, CropStatus::InTransit, CropStatus::Available);
            return Err(e.into());
        }

        if let Err(e) = self.stores.insert_transaction(transaction) {
            // The Transport event stays: the ledger is append-only, and an
            // event for a batch returned to 'available' is an observable,
            // legal state.
            self.revert_delivery(&delivery.id_typed());
            self.revert_crop(&crop_id, CropStatus::InTransit, CropStatus::Available);
            return Err(e.into());
        }

        tracing::info!(
            crop_id = %crop_id,
            delivery_id = %delivery.id_typed(),
            batch_id = %crop.batch_id(),
            "crop accepted for distribution"
        );
        Ok(delivery)
    }

    /// Distributor puts a pending delivery on the road. Already-in-transit
    /// is a no-op.
    pub fn start_transport(&self, actor: Actor, delivery_id: DeliveryId) -> Result<(), ChainError> {
        authorize(actor.role, ChainAction::StartTransport)?;
        let delivery = self.owned_delivery(actor, delivery_id, Delivery::distributor)?;

        let mut updated = delivery.clone();
        updated.start_transport()?;
        if updated.status() != delivery.status() {
            self.stores.update_delivery_status(
                &delivery_id,
                delivery.status(),
                updated.status(),
            )?;
            tracing::info!(delivery_id = %delivery_id, "transport started");
        }
        Ok(())
    }

    pub fn update_tracking(
        &self,
        actor: Actor,
        delivery_id: DeliveryId,
        note: &str,
    ) -> Result<(), ChainError> {
        authorize(actor.role, ChainAction::UpdateTracking)?;
        let delivery = self.owned_delivery(actor, delivery_id, Delivery::distributor)?;

        // Domain check only; the note itself is free text.
        let mut updated = delivery.clone();
        updated.update_tracking(note)?;
        self.stores.update_delivery_tracking(&delivery_id, note)?;
        Ok(())
    }

    /// Assigned retailer accepts an in-transit delivery: delivery and crop
    /// both become delivered, and the `Retail` event is appended.
    pub fn accept_delivery(&self, actor: Actor, delivery_id: DeliveryId) -> Result<(), ChainError> {
        authorize(actor.role, ChainAction::AcceptDelivery)?;
        let delivery = self.owned_delivery(actor, delivery_id, Delivery::retailer)?;

        // Validate the transition before touching the store.
        let mut updated = delivery.clone();
        updated.mark_delivered()?;

        let crop = self
            .stores
            .get_crop(&delivery.crop())?
            .ok_or(ChainError::NotFound("crop"))?;

        self.stores.update_delivery_status(
            &delivery_id,
            DeliveryStatus::InTransit,
            DeliveryStatus::Delivered,
        )?;

        if let Err(e) = self.stores.update_crop_status(
            &delivery.crop(),
            CropStatus::InTransit,
            CropStatus::Delivered,
        ) {
            self.revert_delivery_status(
                &delivery_id,
                DeliveryStatus::Delivered,
                DeliveryStatus::InTransit,
            );
            return Err(e.into());
        }

        if let Err(e) = self.ledger.append(TraceAppend {
            batch_id: crop.batch_id().clone(),
            step_type: StepType::Retail,
            actor: actor.id,
            details: "Received by retailer".to_string(),
            location: None,
        }) {
            self.revert_crop(&delivery.crop(), CropStatus::Delivered, CropStatus::InTransit);
            self.revert_delivery_status(
                &delivery_id,
                DeliveryStatus::Delivered,
                DeliveryStatus::InTransit,
            );
            return Err(e.into());
        }

        tracing::info!(
            delivery_id = %delivery_id,
            batch_id = %crop.batch_id(),
            "delivery accepted"
        );
        Ok(())
    }

    pub fn deliveries_for(
        &self,
        user: UserId,
        role: Role,
        filter: &DeliveryFilter,
    ) -> Result<Vec<Delivery>, ChainError> {
        let filter = match role {
            Role::Retailer => DeliveryFilter {
                retailer: Some(user),
                ..filter.clone()
            },
            _ => DeliveryFilter {
                distributor: Some(user),
                ..filter.clone()
            },
        };
        Ok(self.stores.list_deliveries(&filter)?)
    }

    // ── Sales & payments ────────────────────────────────────────────────

    /// Retailer records a sale from delivered stock.
    ///
    /// Always appends the `Sale` event; additionally records a custody
    /// transaction when the buyer is a registered user. Crop status is
    /// untouched — the farmer override is the only path to `sold`.
    pub fn record_sale(
        &self,
        actor: Actor,
        crop_id: CropId,
        quantity: Quantity,
        unit_price: Money,
        buyer: Option<UserId>,
        customer_name: Option<String>,
    ) -> Result<SaleRecord, ChainError> {
        authorize(actor.role, ChainAction::RecordSale)?;

        let crop = self
            .stores
            .get_crop(&crop_id)?
            .ok_or(ChainError::NotFound("crop"))?;

        // Stock check: the batch must have been delivered to this retailer.
        let delivered = self.stores.list_deliveries(&DeliveryFilter {
            crop: Some(crop_id),
            retailer: Some(actor.id),
            status: Some(DeliveryStatus::Delivered),
            ..DeliveryFilter::default()
        })?;
        if delivered.is_empty() {
            return Err(
                DomainError::forbidden("no delivered stock of this batch for this retailer").into(),
            );
        }

        let customer = customer_name.unwrap_or_else(|| "Anonymous".to_string());
        let total = unit_price.total_for(quantity);

        let transaction = match buyer {
            Some(buyer_id) => {
                let tx = Transaction::create(
                    TransactionId::new(),
                    NewTransaction {
                        crop: crop_id,
                        from: actor.id,
                        to: buyer_id,
                        kind: "sale".to_string(),
                        amount: Some(total),
                        transport_details: None,
                    },
                    Utc::now(),
                )?;
                self.stores.insert_transaction(tx.clone())?;
                Some(tx)
            }
            None => None,
        };

        let trace = self.ledger.append(TraceAppend {
            batch_id: crop.batch_id().clone(),
            step_type: StepType::Sale,
            actor: actor.id,
            details: format!("Sold to customer: {customer} ({quantity} at {unit_price}/kg)"),
            location: None,
        })?;

        tracing::info!(crop_id = %crop_id, batch_id = %crop.batch_id(), "sale recorded");
        Ok(SaleRecord { trace, transaction })
    }

    /// Record a completed payment. No gateway is involved: the status is
    /// written once, at creation.
    pub fn record_payment(
        &self,
        actor: Actor,
        payee: UserId,
        crop: Option<CropId>,
        amount: Money,
        method: Option<String>,
    ) -> Result<Payment, ChainError> {
        authorize(actor.role, ChainAction::RecordPayment)?;
        if self.stores.get_user(&payee)?.is_none() {
            return Err(ChainError::NotFound("payee"));
        }

        let payment = Payment::create(
            PaymentId::new(),
            NewPayment {
                amount,
                payer: actor.id,
                payee,
                crop,
                status: PaymentStatus::Completed,
                method,
                external_reference: None,
            },
            Utc::now(),
        )?;
        self.stores.insert_payment(payment.clone())?;
        tracing::info!(payment_id = %payment.id_typed(), amount = %amount, "payment recorded");
        Ok(payment)
    }

    /// Post-creation payment transitions are not modeled; this surfaces the
    /// domain stub so callers get a typed answer instead of a missing method.
    pub fn transition_payment(
        &self,
        _actor: Actor,
        payment_id: PaymentId,
        to: PaymentStatus,
    ) -> Result<(), ChainError> {
        let mut payment = self
            .stores
            .get_payment(&payment_id)?
            .ok_or(ChainError::NotFound("payment"))?;
        payment.transition(to)?;
        Ok(())
    }

    pub fn payments_to(&self, payee: UserId) -> Result<Vec<Payment>, ChainError> {
        Ok(self.stores.list_payments(&PaymentFilter {
            payee: Some(payee),
            ..PaymentFilter::default()
        })?)
    }

    pub fn payments_from(&self, payer: UserId) -> Result<Vec<Payment>, ChainError> {
        Ok(self.stores.list_payments(&PaymentFilter {
            payer: Some(payer),
            ..PaymentFilter::default()
        })?)
    }

    pub fn transactions_of(&self, user: UserId) -> Result<Vec<Transaction>, ChainError> {
        Ok(self.stores.list_transactions_for_user(&user)?)
    }

    // ── Provenance ──────────────────────────────────────────────────────

    /// Reconstruct a batch's journey. Open to every role and to
    /// unauthenticated consumers; `Ok(None)` is the unknown-batch answer.
    pub fn trace_batch(&self, batch_id: &BatchId) -> Result<Option<BatchJourney>, ChainError> {
        Ok(journey::trace_batch(&self.stores, &self.ledger, batch_id)?)
    }

    /// Share of registered batches with ≥ 2 trace steps (admin report).
    pub fn trace_completeness(&self) -> Result<f64, ChainError> {
        Ok(journey::stats::completeness(&self.stores, &self.ledger, 2)?)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn owned_delivery(
        &self,
        actor: Actor,
        delivery_id: DeliveryId,
        owner: impl Fn(&Delivery) -> UserId,
    ) -> Result<Delivery, ChainError> {
        let delivery = self
            .stores
            .get_delivery(&delivery_id)?
            .ok_or(ChainError::NotFound("delivery"))?;
        if owner(&delivery) != actor.id {
            return Err(DomainError::forbidden("delivery belongs to another user").into());
        }
        Ok(delivery)
    }

    fn revert_crop(&self, crop_id: &CropId, from: CropStatus, to: CropStatus) {
        if let Err(e) = self.stores.update_crop_status(crop_id, from, to) {
            tracing::warn!(crop_id = %crop_id, error = %e, "crop compensation failed");
        }
    }

    fn revert_delivery(&self, delivery_id: &DeliveryId) {
        if let Err(e) = self.stores.delete_delivery(delivery_id) {
            tracing::warn!(delivery_id = %delivery_id, error = %e, "delivery compensation failed");
        }
    }

    fn revert_delivery_status(
        &self,
        delivery_id: &DeliveryId,
        from: DeliveryStatus,
        to: DeliveryStatus,
    ) {
        if let Err(e) = self.stores.update_delivery_status(delivery_id, from, to) {
            tracing::warn!(delivery_id = %delivery_id, error = %e, "delivery compensation failed");
        }
    }
}
