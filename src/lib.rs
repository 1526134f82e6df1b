#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
//! Cell types and in-order delivery for an onion-routing link protocol
//!
//! # Overview
//!
//! All communication between adjacent nodes on an onion-routing link
//! happens in fixed-size protocol units called "cells".  Each cell
//! belongs to a "circuit": a logical multi-hop path that is identified
//! per-link by a circuit ID, and whose cells must be processed in the
//! order the sender intended, even though the network may deliver them
//! out of order.
//!
//! This crate implements that atomic layer and nothing above it:
//!
//! * [`cell::Cell`] is the immutable fixed-size unit itself, along with
//!   a [codec](cell::codec) for the wire framing.
//! * [`reorder::ReorderBuffer`] accepts sequence-tagged cells for one
//!   circuit in any arrival order and releases them strictly in
//!   sequence, holding early arrivals in a bounded buffer.
//! * [`CircMap`] keeps one independent buffer per live circuit, so that
//!   tearing down a circuit is a simple remove-and-dispose.
//!
//! # Not in this crate
//!
//! This crate does _not_ interpret cell commands, unwrap cryptographic
//! layers, build circuits, or multiplex streams.  Those are the
//! business of the code that consumes the cells this crate hands back
//! in order.  Nor does it own a network connection: the caller parses
//! frames off its transport with [`cell::codec::CellCodec`] and feeds
//! the results in.
//!
//! # Design notes
//!
//! Nothing here blocks, and nothing here reads a clock: operations that
//! depend on time take a caller-provided [`std::time::Instant`].  Each
//! circuit's buffer assumes it is driven by one execution context at a
//! time (the transport demultiplexer upstream serializes deliveries),
//! so there is no internal locking; every type is safe to move between
//! threads between uses.
//!
//! Errors are scoped to a single circuit.  A misbehaving peer can fill
//! one circuit's buffer or stall one circuit's sequence space, but it
//! cannot disturb any other circuit sharing the link.

#![allow(renamed_and_removed_lints)]
#![allow(unknown_lints)]
#![deny(missing_docs)]
#![warn(noop_method_call)]
#![deny(unreachable_pub)]
#![warn(clippy::all)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::cargo_common_metadata)]
#![deny(clippy::cast_lossless)]
#![deny(clippy::checked_conversions)]
#![warn(clippy::cognitive_complexity)]
#![deny(clippy::debug_assert_with_mut_call)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]
#![deny(clippy::expl_impl_clone_on_copy)]
#![deny(clippy::fallible_impl_from)]
#![deny(clippy::implicit_clone)]
#![deny(clippy::large_stack_arrays)]
#![warn(clippy::manual_ok_or)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::option_option)]
#![warn(clippy::rc_buffer)]
#![deny(clippy::ref_option_ref)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(clippy::trait_duplication_in_bounds)]
#![deny(clippy::unnecessary_wraps)]
#![warn(clippy::unseparated_literal_suffix)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::let_unit_value)] // This can reasonably be done for explicitness
#![allow(clippy::uninlined_format_args)]

pub mod cell;
pub mod circmap;
mod err;
pub mod reorder;

pub use circmap::CircMap;
pub use err::Error;

/// A Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
