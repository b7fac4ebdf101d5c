// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Responder/observer links.
//!
//! Each link is stored twice: as `linkedObservers[o]` on the responder and
//! as `observing[r]` on the observer. The graph turns both halves into one
//! set of `(responder, observer)` links so lookups go in either direction
//! and drift between the halves can be reported.

use crate::db::{collections, DocumentStore};
use crate::error::Result;
use crate::models::{Role, User};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A responder/observer link.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Link {
    pub responder_id: String,
    pub observer_id: String,
}

/// A disagreement between the two stored halves of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkIssue {
    /// Observer lists the responder but the responder does not list the observer
    MissingOnResponder {
        responder_id: String,
        observer_id: String,
    },
    /// Responder lists the observer but the observer does not list the responder
    MissingOnObserver {
        responder_id: String,
        observer_id: String,
    },
    /// The name stored in `holder_id`'s map differs from `subject_id`'s name
    NameMismatch {
        holder_id: String,
        subject_id: String,
        stored: String,
        actual: String,
    },
    /// A link points at a user that does not exist or has the wrong role
    DanglingUser {
        holder_id: String,
        missing_id: String,
    },
}

#[derive(Debug, Default)]
pub struct RelationshipGraph {
    users: BTreeMap<String, User>,
    links: BTreeSet<Link>,
}

impl RelationshipGraph {
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Self {
        let users: BTreeMap<String, User> =
            users.into_iter().map(|u| (u.id.clone(), u)).collect();

        let mut links = BTreeSet::new();
        for user in users.values() {
            match user.role {
                Role::Responder => {
                    for observer_id in user.linked_observers.keys() {
                        links.insert(Link {
                            responder_id: user.id.clone(),
                            observer_id: observer_id.clone(),
                        });
                    }
                }
                Role::Observer => {
                    for responder_id in user.observing.keys() {
                        links.insert(Link {
                            responder_id: responder_id.clone(),
                            observer_id: user.id.clone(),
                        });
                    }
                }
                Role::Unknown => {}
            }
        }

        Self { users, links }
    }

    /// Build the graph from every readable stored user.
    pub async fn load(db: &dyn DocumentStore) -> Result<Self> {
        let users: Vec<User> = db.collection(collections::USERS).stream_valid().await?;
        Ok(Self::from_users(users))
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn observers_of(&self, responder_id: &str) -> Vec<&str> {
        self.links
            .iter()
            .filter(|l| l.responder_id == responder_id)
            .map(|l| l.observer_id.as_str())
            .collect()
    }

    pub fn responders_of(&self, observer_id: &str) -> Vec<&str> {
        self.links
            .iter()
            .filter(|l| l.observer_id == observer_id)
            .map(|l| l.responder_id.as_str())
            .collect()
    }

    /// Counterparts of `user_id` whose stored map still references it.
    ///
    /// Only users with the opposite role are considered, so this is empty for
    /// users of unknown role.
    pub fn back_references(&self, user_id: &str) -> Vec<&User> {
        let Some(counterpart_role) = self.user(user_id).and_then(|u| u.role.counterpart()) else {
            return Vec::new();
        };

        let candidates = match counterpart_role {
            Role::Observer => self.observers_of(user_id),
            _ => self.responders_of(user_id),
        };

        candidates
            .into_iter()
            .filter_map(|id| self.user(id))
            .filter(|u| u.role == counterpart_role && u.links().contains_key(user_id))
            .collect()
    }

    /// Every disagreement between stored link halves, in link order.
    pub fn audit(&self) -> Vec<LinkIssue> {
        let mut issues = Vec::new();

        for link in &self.links {
            let responder = self
                .user(&link.responder_id)
                .filter(|u| u.role == Role::Responder);
            let observer = self
                .user(&link.observer_id)
                .filter(|u| u.role == Role::Observer);

            let (responder, observer) = match (responder, observer) {
                (Some(r), Some(o)) => (r, o),
                (None, _) => {
                    issues.push(LinkIssue::DanglingUser {
                        holder_id: link.observer_id.clone(),
                        missing_id: link.responder_id.clone(),
                    });
                    continue;
                }
                (_, None) => {
                    issues.push(LinkIssue::DanglingUser {
                        holder_id: link.responder_id.clone(),
                        missing_id: link.observer_id.clone(),
                    });
                    continue;
                }
            };

            match responder.linked_observers.get(&observer.id) {
                None => issues.push(LinkIssue::MissingOnResponder {
                    responder_id: responder.id.clone(),
                    observer_id: observer.id.clone(),
                }),
                Some(stored) if *stored != observer.name => issues.push(LinkIssue::NameMismatch {
                    holder_id: responder.id.clone(),
                    subject_id: observer.id.clone(),
                    stored: stored.clone(),
                    actual: observer.name.clone(),
                }),
                Some(_) => {}
            }

            match observer.observing.get(&responder.id) {
                None => issues.push(LinkIssue::MissingOnObserver {
                    responder_id: responder.id.clone(),
                    observer_id: observer.id.clone(),
                }),
                Some(stored) if *stored != responder.name => issues.push(LinkIssue::NameMismatch {
                    holder_id: observer.id.clone(),
                    subject_id: responder.id.clone(),
                    stored: stored.clone(),
                    actual: responder.name.clone(),
                }),
                Some(_) => {}
            }
        }

        issues
    }
}
