//! Interface discovery and canonical ordering.
//!
//! The first conversion pass registers every interface that appears in the
//! trace. [`InterfaceRegistry::finalize`] then sorts them and hands out the
//! pcapng interface ids used by the second pass.

use std::collections::HashMap;
use std::fmt;

use crate::error::{ConversionError, Result};
use crate::event::Keywords;

/// Link-layer classification of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// Wired Ethernet
    Ethernet,
    /// Native 802.11
    Wifi,
    /// Mobile broadband, raw IP frames
    RawIp,
}

impl MediaType {
    /// Classify an interface from the keywords of an event seen on it.
    pub fn from_keywords(keywords: Keywords) -> Self {
        if keywords.contains(Keywords::MEDIA_NATIVE_802_11) {
            MediaType::Wifi
        } else if keywords.contains(Keywords::MEDIA_WIRELESS_WAN) {
            MediaType::RawIp
        } else {
            MediaType::Ethernet
        }
    }

    /// pcapng link type.
    pub fn link_type(self) -> u16 {
        match self {
            MediaType::Ethernet => 1,
            MediaType::RawIp => 101,
            MediaType::Wifi => 105,
        }
    }

    /// Short label used in the interface listing.
    pub fn label(self) -> &'static str {
        match self {
            MediaType::Ethernet => "eth",
            MediaType::Wifi => "wifi",
            MediaType::RawIp => "mbb",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A network interface seen in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interface {
    /// Index of the interface the event was captured on (unique key)
    pub lower_index: u32,
    /// Index of the miniport at the bottom of the stack
    pub miniport_index: u32,
    pub media_type: MediaType,
    /// pcapng interface id, assigned by [`InterfaceRegistry::finalize`]
    pub output_index: Option<u32>,
}

impl Interface {
    /// Whether this is a filter layered above another interface.
    pub fn is_layered(&self) -> bool {
        self.lower_index != self.miniport_index
    }

    fn sort_key(&self) -> (u32, bool, u32) {
        // false sorts before true, so the miniport itself leads its group.
        (self.miniport_index, self.is_layered(), self.lower_index)
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IF: medium={:<4} ID=", self.media_type.label())?;
        match self.output_index {
            Some(id) => write!(f, "{id}")?,
            None => f.write_str("?")?,
        }
        write!(f, "\tIfIndex={}", self.lower_index)?;
        if self.is_layered() {
            write!(f, "\t(LWF over IfIndex {})", self.miniport_index)?;
        }
        Ok(())
    }
}

/// Result of [`InterfaceRegistry::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First sighting, interface registered
    Registered,
    /// Known interface, same media type
    Known,
    /// Known interface, event disagrees on media type (original kept)
    Inconsistent { stored: MediaType, observed: MediaType },
}

/// Registry of interfaces keyed by lower interface index.
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    interfaces: HashMap<u32, Interface>,
    finalized: bool,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    #[inline]
    pub fn lookup(&self, lower_index: u32) -> Option<&Interface> {
        self.interfaces.get(&lower_index)
    }

    /// Insert an interface if `lower_index` is unseen.
    ///
    /// An already registered interface is left untouched. Fails only when
    /// the table cannot grow.
    pub fn register(
        &mut self,
        lower_index: u32,
        miniport_index: u32,
        media_type: MediaType,
    ) -> Result<()> {
        if self.interfaces.contains_key(&lower_index) {
            return Ok(());
        }
        if self.finalized {
            return Err(ConversionError::InvalidState {
                expected: "discovery",
                found: "finalized",
            }
            .into());
        }

        self.interfaces
            .try_reserve(1)
            .map_err(|_| ConversionError::Allocation {
                lower_if_index: lower_index,
            })?;
        self.interfaces.insert(
            lower_index,
            Interface {
                lower_index,
                miniport_index,
                media_type,
                output_index: None,
            },
        );
        Ok(())
    }

    /// Compare an observed media type with the stored one.
    ///
    /// Returns `None` for an unknown interface.
    pub fn check_media_type(&self, lower_index: u32, observed: MediaType) -> Option<Observation> {
        self.lookup(lower_index).map(|iface| {
            if iface.media_type == observed {
                Observation::Known
            } else {
                Observation::Inconsistent {
                    stored: iface.media_type,
                    observed,
                }
            }
        })
    }

    /// Record one sighting: register on first sight, otherwise check the
    /// media type. `miniport_index` is only evaluated for new interfaces.
    pub fn observe<F>(
        &mut self,
        lower_index: u32,
        media_type: MediaType,
        miniport_index: F,
    ) -> Result<Observation>
    where
        F: FnOnce() -> Result<u32>,
    {
        if let Some(observation) = self.check_media_type(lower_index, media_type) {
            if let Observation::Inconsistent { stored, observed } = observation {
                tracing::warn!(
                    lower_index,
                    %stored,
                    %observed,
                    "inconsistent media type in packet events"
                );
            }
            return Ok(observation);
        }

        let miniport_index = miniport_index()?;
        self.register(lower_index, miniport_index, media_type)?;
        tracing::debug!(lower_index, miniport_index, %media_type, "registered interface");
        Ok(Observation::Registered)
    }

    /// Assign output indices in canonical order and return the interfaces in
    /// that order.
    ///
    /// Interfaces are grouped by ascending miniport index. Within a group the
    /// miniport itself (`lower_index == miniport_index`) comes first, then the
    /// layered interfaces by ascending lower index.
    pub fn finalize(&mut self) -> Vec<Interface> {
        let mut ordered: Vec<Interface> = self.interfaces.values().copied().collect();
        ordered.sort_by_key(Interface::sort_key);

        for (position, iface) in ordered.iter_mut().enumerate() {
            let output_index = position as u32;
            iface.output_index = Some(output_index);
            if let Some(stored) = self.interfaces.get_mut(&iface.lower_index) {
                stored.output_index = Some(output_index);
            }
        }

        self.finalized = true;
        ordered
    }

    /// pcapng interface id for a lower index, once finalized.
    pub fn output_index(&self, lower_index: u32) -> Option<u32> {
        self.lookup(lower_index).and_then(|iface| iface.output_index)
    }
}
