//! Implements the standard arithmetic operator traits for single-field tuple structs.

#[macro_export]
macro_rules! op {
    (binary $ty:ty, $op:ident, $fn_name:ident) => {
        impl $op for $ty {
            type Output = Self;

            fn $fn_name(self, rhs: Self) -> Self::Output {
                Self(self.0.$fn_name(rhs.0))
            }
        }
    };
    (inplace $ty:ty, $op:ident, $fn_name:ident) => {
        impl $op for $ty {
            fn $fn_name(&mut self, rhs: Self) {
                self.0.$fn_name(rhs.0)
            }
        }
    };
    (unary $ty:ty, $op:ident, $fn_name:ident) => {
        impl $op for $ty {
            type Output = Self;

            fn $fn_name(self) -> Self::Output {
                Self(self.0.$fn_name())
            }
        }
    };
}
