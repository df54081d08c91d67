//! s3putsecure Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `LocalFileRecord`, `RemoteObject`, `SyncDecision`, `TransferJob`
//! - **Use cases** - `decide`, `RemoteStateReader`
//! - **Port definitions** - Traits for adapters: `IObjectStore`, `IEncryptionProvider`, `ISyncObserver`
//! - **Configuration** - YAML configuration file with validation and a builder
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`s3putsecure-s3` for the object store, `s3putsecure-sync` for GnuPG).
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
