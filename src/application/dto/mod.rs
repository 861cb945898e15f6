// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据传输对象模块
///
/// 定义管理接口的请求对象，负责输入校验并转换为领域服务的输入
pub mod scraper_request;
