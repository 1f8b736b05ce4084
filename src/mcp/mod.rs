// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Model Context Protocol (MCP) server surface.
//!
//! The MCP layer advertises the tool catalog, parses invocations against the
//! per-tool schemas, and routes them to the bridge, the build engine, or the
//! static catalogs.

mod server;
mod types;

pub use server::VibeCraftMcp;
