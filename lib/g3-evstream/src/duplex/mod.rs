/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod composite;
pub use composite::CompositeStream;

mod resource;
pub use resource::DuplexResourceStream;
