// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

mod admin_service_test;
mod api_test;
pub mod helpers;
