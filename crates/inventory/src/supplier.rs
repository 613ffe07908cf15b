use serde::{Deserialize, Serialize};

use stockcare_core::{DomainError, DomainResult, Entity, SupplierId};

/// Supplier (fornecedor) of supply items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    id: SupplierId,
    name: String,
    email: String,
    phone: String,
    /// Tax registration (CNPJ), stored as its 14 digits.
    cnpj: String,
}

/// Editable supplier attributes, used for both registration and revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub cnpj: String,
}

impl Supplier {
    pub fn register(id: SupplierId, details: SupplierDetails) -> DomainResult<Self> {
        let details = normalize(details)?;
        Ok(Self {
            id,
            name: details.name,
            email: details.email,
            phone: details.phone,
            cnpj: details.cnpj,
        })
    }

    /// Replace all editable attributes; identity is preserved.
    pub fn revise(&mut self, details: SupplierDetails) -> DomainResult<()> {
        let details = normalize(details)?;
        self.name = details.name;
        self.email = details.email;
        self.phone = details.phone;
        self.cnpj = details.cnpj;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn cnpj(&self) -> &str {
        &self.cnpj
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> SupplierId {
        self.id
    }
}

fn normalize(details: SupplierDetails) -> DomainResult<SupplierDetails> {
    let name = details.name.trim().to_string();
    if name.is_empty() {
        return Err(DomainError::validation("supplier name cannot be empty"));
    }

    let email = details.email.trim().to_string();
    if !email.is_empty() && !email.contains('@') {
        return Err(DomainError::validation("supplier email is malformed"));
    }

    let cnpj: String = details.cnpj.chars().filter(char::is_ascii_digit).collect();
    if cnpj.len() != 14 {
        return Err(DomainError::validation("cnpj must contain 14 digits"));
    }

    Ok(SupplierDetails {
        name,
        email,
        phone: details.phone.trim().to_string(),
        cnpj,
    })
}
