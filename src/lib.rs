//! LexAid - Legal-aid case management, real-time consultation backend
//!
//! This crate implements the video-consultation subsystem: a room-based
//! signaling relay for peer-to-peer call negotiation, the consultation
//! lifecycle state machine, and the event bridge that pushes
//! asynchronous notifications to connected clients.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
