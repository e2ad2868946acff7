//! 设备注册表
//!
//! 由内核初始化流程创建并传给存储栈，测试中每个用例各自持有一份。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{self, Ordering};

use spin::Mutex;

use crate::{Device, Error, Result};

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    /// 最近注册的设备位于表头
    devices: Mutex<Vec<Arc<Device>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记设备，名称重复或为空时失败
    pub fn register(&self, device: Device) -> Result<Arc<Device>> {
        if device.name().is_empty() || device.block_size() == 0 {
            return Err(Error::InvalidArgument);
        }

        let mut devices = self.devices.lock();
        if devices.iter().any(|dev| dev.name() == device.name()) {
            log::warn!("device {:?} already registered", device.name());
            return Err(Error::AlreadyExists);
        }

        let device = Arc::new(device);
        devices.insert(0, device.clone());
        // 先挂入表中，再清零统计
        atomic::fence(Ordering::Release);
        device.reset_stats();
        drop(devices);

        log::info!(
            "register device: name={} blocks={} block_size={}",
            device.name(),
            device.block_count(),
            device.block_size()
        );

        Ok(device)
    }

    pub fn find(&self, name: &str) -> Option<Arc<Device>> {
        self.devices
            .lock()
            .iter()
            .find(|dev| dev.name() == name)
            .cloned()
    }

    /// 按注册的逆序列出所有设备
    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.devices.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.devices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
