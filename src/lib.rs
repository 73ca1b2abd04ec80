/*
 * This file is part of hpithres.
 *
 * Copyright (C) 2025 hpithres contributors
 *
 * hpithres is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * hpithres is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with hpithres. If not, see <https://www.gnu.org/licenses/>.
 */

//! hpithres - interactive sensor threshold tool for HPI-managed hardware
//!
//! This library provides the inventory of resources, records and sensors
//! reported by an HPI service, the query commands, the threshold change
//! wizard and the undo of every change made during a session.

pub mod hpi;
pub mod inventory;
pub mod app;
pub mod config;
pub mod console;
pub mod display;
pub mod query;
pub mod mutation;
pub mod undo;
pub mod commands;
pub mod simulator;
pub mod logger;

#[cfg(test)]
pub mod test_utils;
