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

use std::io::{BufRead, Write};

use crate::config::ToolConfig;
use crate::console::Console;
use crate::hpi::HpiService;
use crate::inventory::Inventory;

/// Everything one interactive session owns: the discovered inventory with
/// its per-sensor caches, the service handle, settings and the console.
pub struct App<S, R, W> {
    pub inventory: Inventory,
    pub service: S,
    pub config: ToolConfig,
    pub console: Console<R, W>,
}

impl<S: HpiService, R: BufRead, W: Write> App<S, R, W> {
    pub fn new(inventory: Inventory, service: S, config: ToolConfig, console: Console<R, W>) -> Self {
        App { inventory, service, config, console }
    }

    /// Build the inventory from `service` and wrap everything up.
    pub fn discover(mut service: S, config: ToolConfig, console: Console<R, W>) -> Self {
        let inventory = Inventory::discover(&mut service);
        App::new(inventory, service, config, console)
    }

    pub fn into_parts(self) -> (Inventory, S, Console<R, W>) {
        (self.inventory, self.service, self.console)
    }
}
