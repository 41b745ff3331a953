//! Registration workflow: binding a card to a position.
//!
//! Two independent conflicts can block a binding:
//! - the card already belongs to another member
//! - the member holding the position already carries a different card
//!
//! Either one requires an explicit override. With override, the card is
//! taken from its previous owner and bound to the target in one store
//! transaction: either both happen or neither does.
//!
//! The target of a position is the first member record holding it. Vacant
//! seats (empty name) count.

use std::sync::Arc;

use tracing::{error, info, warn};

use rollcall_core::{CardId, Conflict, Error, MemberId, Result};
use rollcall_storage::{AttendanceStore, Member};

use crate::display::{StatusMessage, Tone};
use crate::messages;

/// A completed binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// The member now carrying the card.
    pub member: Member,

    /// Member the card was taken from, on override.
    pub previous_owner: Option<MemberId>,

    /// Card the target carried before, on override.
    pub replaced_card: Option<String>,

    /// `false` when the card was already bound to the target.
    pub changed: bool,
}

/// Status line text for a registration result.
pub fn registration_status(result: &Result<Registration>) -> StatusMessage {
    match result {
        Ok(registration) => StatusMessage::new(
            messages::registered(&registration.member.position),
            Tone::Success,
        ),
        Err(Error::RegistrationConflict(Conflict::CardOwned { owner_position })) => {
            StatusMessage::new(messages::card_already_registered(owner_position), Tone::Error)
        }
        Err(Error::RegistrationConflict(Conflict::PositionBound { .. })) => {
            StatusMessage::new(messages::POSITION_HAS_CARD, Tone::Error)
        }
        Err(Error::NoMemberForPosition(_)) => {
            StatusMessage::new(messages::NO_POSITION_SELECTED, Tone::Error)
        }
        Err(_) => StatusMessage::new(messages::REGISTRATION_FAILED, Tone::Error),
    }
}

pub struct RegistrationWorkflow<S> {
    store: Arc<S>,
}

impl<S> Clone for RegistrationWorkflow<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: AttendanceStore> RegistrationWorkflow<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Positions for the picker, in first-seen order.
    pub async fn positions(&self) -> Result<Vec<String>> {
        self.store
            .list_distinct_positions()
            .await
            .map_err(Error::store)
    }

    /// Current owner of `card`, if any.
    pub async fn check_card(&self, card: &CardId) -> Result<Option<Member>> {
        self.store
            .find_member_by_card(card)
            .await
            .map_err(Error::store)
    }

    /// Bind `card` to the member holding `position`.
    ///
    /// # Errors
    ///
    /// - `Error::NoMemberForPosition` if no record holds `position`
    /// - `Error::RegistrationConflict` if the card or the position is taken
    ///   and `override_existing` is false
    /// - `Error::StoreUnavailable` on store failures
    pub async fn register(
        &self,
        position: &str,
        card: &CardId,
        override_existing: bool,
    ) -> Result<Registration> {
        let position = position.trim();
        if position.is_empty() {
            return Err(Error::NoMemberForPosition(String::new()));
        }

        let owner = self.check_card(card).await?;
        let target = self
            .store
            .list_members_by_position(position)
            .await
            .map_err(Error::store)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoMemberForPosition(position.to_string()))?;

        if owner.as_ref().is_some_and(|owner| owner.id == target.id) {
            info!(member_id = target.id, card = %card, "card already bound to position");
            return Ok(Registration {
                member: target,
                previous_owner: None,
                replaced_card: None,
                changed: false,
            });
        }

        if !override_existing {
            if let Some(owner) = &owner {
                return Err(Error::RegistrationConflict(Conflict::CardOwned {
                    owner_position: owner.position.clone(),
                }));
            }
            if let Some(existing) = &target.rfid_tag {
                return Err(Error::RegistrationConflict(Conflict::PositionBound {
                    existing_card: existing.clone(),
                }));
            }
        }

        if let Some(owner) = &owner {
            warn!(
                member_id = owner.id,
                position = %owner.position,
                card = %card,
                "moving card from previous owner"
            );
        }

        let bound = self
            .store
            .rebind_tag(owner.as_ref().map(|owner| owner.id), target.id, card)
            .await
            .map_err(|err| {
                error!(member_id = target.id, card = %card, error = %err, "failed to bind card");
                Error::store(err)
            })?;
        if !bound {
            return Err(Error::store(format!("member {} not found", target.id)));
        }

        info!(
            member_id = target.id,
            position = %target.position,
            card = %card,
            "card registered"
        );

        let replaced_card = target.rfid_tag.clone();
        let member = Member {
            rfid_tag: Some(card.as_str().to_string()),
            ..target
        };
        Ok(Registration {
            member,
            previous_owner: owner.map(|owner| owner.id),
            replaced_card,
            changed: true,
        })
    }
}

/// Inputs collected on the registration screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationForm {
    pub card: Option<CardId>,
    pub position: Option<String>,
    pub override_enabled: bool,
}

impl RegistrationForm {
    /// The card and position to submit.
    ///
    /// # Errors
    ///
    /// The prompt to show when a field is missing.
    pub fn submission(&self) -> std::result::Result<(CardId, String), &'static str> {
        let card = self.card.clone().ok_or(messages::NO_CARD_SCANNED)?;
        let position = self
            .position
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(messages::NO_POSITION_SELECTED)?;
        Ok((card, position.to_string()))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
