#![forbid(unsafe_code)]

//! Host-supplied access gating.
//!
//! Containers may be marked as visible to the server role, the client role,
//! or both. Before every read or write the container asks its
//! [`AccessGuard`] whether the access is allowed. A refusal is advisory: the
//! container logs it and carries on.
//!
//! The guard is a plain predicate so hosts without any networking layer pay
//! nothing ([`AccessGuard::permissive`]) and hosts with one can plug in their
//! own notion of which roles are active ([`AccessGuard::roles`]).

use std::fmt;
use std::rc::Rc;

bitflags::bitflags! {
    /// Network roles a container is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Roles: u8 {
        /// Accessible on the server.
        const SERVER = 1 << 0;
        /// Accessible on clients.
        const CLIENT = 1 << 1;
    }
}

/// Kind of access being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessOp {
    Get,
    Set,
}

impl fmt::Display for AccessOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("get"),
            Self::Set => f.write_str("set"),
        }
    }
}

/// One access attempt, as presented to the guard.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Name of the container being accessed.
    pub container: &'a str,
    pub op: AccessOp,
    /// Roles the container is declared visible to.
    pub visibility: Roles,
}

/// An access the guard refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessViolation {
    pub container: String,
    pub op: AccessOp,
    /// The role whose absence caused the refusal.
    pub role: Roles,
}

impl fmt::Display for AccessViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = if self.role == Roles::SERVER {
            "server"
        } else if self.role == Roles::CLIENT {
            "client"
        } else {
            "required"
        };
        write!(
            f,
            "{} of '{}' requires the {role} role, which is not active",
            self.op, self.container
        )
    }
}

impl std::error::Error for AccessViolation {}

type Predicate = dyn Fn(&AccessRequest<'_>) -> Result<(), AccessViolation>;

/// Pluggable access predicate. Cloning shares the predicate.
#[derive(Clone, Default)]
pub struct AccessGuard {
    predicate: Option<Rc<Predicate>>,
}

impl fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGuard")
            .field("permissive", &self.predicate.is_none())
            .finish()
    }
}

impl AccessGuard {
    /// Guard that allows everything.
    #[must_use]
    pub fn permissive() -> Self {
        Self { predicate: None }
    }

    /// Guard backed by an arbitrary predicate.
    #[must_use]
    pub fn from_fn(
        predicate: impl Fn(&AccessRequest<'_>) -> Result<(), AccessViolation> + 'static,
    ) -> Self {
        Self {
            predicate: Some(Rc::new(predicate)),
        }
    }

    /// Role-flag policy.
    ///
    /// `active` reports which roles the host currently runs as. A container
    /// visible to [`Roles::CLIENT`] needs an active client; one visible to
    /// [`Roles::SERVER`] needs an active server. Containers with no
    /// visibility flags are never refused.
    #[must_use]
    pub fn roles(active: impl Fn() -> Roles + 'static) -> Self {
        Self::from_fn(move |req| {
            let active = active();
            for role in [Roles::CLIENT, Roles::SERVER] {
                if req.visibility.contains(role) && !active.contains(role) {
                    return Err(AccessViolation {
                        container: req.container.to_owned(),
                        op: req.op,
                        role,
                    });
                }
            }
            Ok(())
        })
    }

    #[must_use]
    pub fn is_permissive(&self) -> bool {
        self.predicate.is_none()
    }

    /// Run the predicate. Callers decide how to report a refusal.
    pub fn check(&self, request: &AccessRequest<'_>) -> Result<(), AccessViolation> {
        match &self.predicate {
            Some(predicate) => predicate(request),
            None => Ok(()),
        }
    }
}
