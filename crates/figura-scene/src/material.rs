use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub texture: Option<usize>,
    pub unlit: bool,
    pub wireframe: bool,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            texture: None,
            unlit: false,
            wireframe: false,
            double_sided: false,
        }
    }
}

impl Material {
    pub fn wireframe_overlay() -> Self {
        Self {
            name: "wireframe".to_string(),
            base_color: [1.0, 1.0, 1.0, 1.0],
            unlit: true,
            wireframe: true,
            double_sided: true,
            ..Self::default()
        }
    }

    pub fn unlit(name: &str, base_color: [f32; 4]) -> Self {
        Self {
            name: name.to_string(),
            base_color,
            unlit: true,
            ..Self::default()
        }
    }
}

/// Shared, mutable material. Cloning the handle shares the material; identity is pointer identity.
#[derive(Clone, Debug)]
pub struct MaterialHandle(Rc<RefCell<Material>>);

impl MaterialHandle {
    pub fn new(material: Material) -> Self {
        Self(Rc::new(RefCell::new(material)))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn borrow(&self) -> Ref<'_, Material> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Material> {
        self.0.borrow_mut()
    }

    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_identity_and_state() {
        let a = MaterialHandle::new(Material::default());
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        b.borrow_mut().base_color = [1.0, 0.0, 0.0, 1.0];
        assert_eq!(a.borrow().base_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(a.holders(), 2);
    }

    #[test]
    fn equal_contents_are_not_the_same_handle() {
        let a = MaterialHandle::new(Material::default());
        let b = MaterialHandle::new(Material::default());
        assert!(!a.ptr_eq(&b));
    }
}
