//! Programs: a set of kernels compiled against one platform.

use std::sync::Arc;

use crate::kernel::Kernel;
use crate::platform::Platform;

/// A kernelized quantum program.
///
/// Kernels exclusively own their gates; gates are never shared between
/// kernels. The platform is shared read-only with whoever else needs it.
#[derive(Debug, Clone)]
pub struct Program {
    /// Program name, used in output file prefixes.
    pub name: String,
    /// The target platform.
    pub platform: Arc<Platform>,
    /// The kernels, in execution order.
    pub kernels: Vec<Kernel>,
}

impl Program {
    /// Create an empty program for a platform.
    pub fn new(name: impl Into<String>, platform: Arc<Platform>) -> Self {
        Self {
            name: name.into(),
            platform,
            kernels: vec![],
        }
    }

    /// Create a kernel sized to this program's platform and append it.
    /// Returns the index of the new kernel.
    pub fn add_kernel(&mut self, name: impl Into<String>) -> usize {
        self.kernels.push(Kernel::new(
            name,
            self.platform.qubit_count,
            self.platform.creg_count,
            self.platform.breg_count,
            self.platform.cycle_time,
        ));
        self.kernels.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_kernel_inherits_platform_shape() {
        let platform = Arc::new(Platform::new(5, 3, 2, 20, "none", vec![]).unwrap());
        let mut program = Program::new("demo", platform);
        let idx = program.add_kernel("init");
        assert_eq!(idx, 0);
        let k = &program.kernels[0];
        assert_eq!(k.qubit_count, 5);
        assert_eq!(k.creg_count, 3);
        assert_eq!(k.breg_count, 2);
        assert_eq!(k.cycle_time, 20);
    }
}
