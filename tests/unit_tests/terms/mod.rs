mod velocity;
